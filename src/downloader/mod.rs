//! Download orchestration
//!
//! This module turns a [`DownloadConfig`] into a finished run:
//!
//! 1. **Dates**: [`DateRange`] yields each calendar day, ascending
//! 2. **Collection**: [`RangeCollector`] fetches every day and paces requests
//! 3. **Execution**: [`DownloadExecutor`] saves the result and reports a
//!    [`RunSummary`]
//!
//! # Quick Start
//!
//! ```no_run
//! use apod_downloader::downloader::{DateRange, DownloadConfig, DownloadExecutor};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2020, 1, 10).unwrap(),
//! );
//! let executor = DownloadExecutor::new(DownloadConfig::new("DEMO_KEY", range, "apod.json"))?;
//! let summary = executor.execute().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Per-date failures and save failures never abort a run; they are logged and
//! counted in the summary. Only building the HTTP client can fail up front.

pub mod collector;
pub mod config;
pub mod date_range;
pub mod executor;

pub use collector::{Collection, RangeCollector};
pub use config::{DownloadConfig, RetryPolicy};
pub use date_range::DateRange;
pub use executor::{DownloadExecutor, RunSummary};

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP client setup failed
    #[error("HTTP client error: {0}")]
    ClientError(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
