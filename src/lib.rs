//! # APOD Downloader Library
//!
//! Fetches Astronomy Picture of the Day metadata from the NASA APOD API for an
//! inclusive range of calendar dates and writes the collected responses to a
//! single JSON file.
//!
//! ## Workflow
//!
//! 1. [`downloader::DateRange`] enumerates the requested days in ascending order
//! 2. [`fetcher::ApodFetcher`] requests one day at a time, retrying on rate limits
//! 3. [`downloader::RangeCollector`] paces requests and accumulates the records
//! 4. [`output::JsonArrayWriter`] writes the records as one JSON array
//!
//! [`downloader::DownloadExecutor`] wires these together from a
//! [`downloader::DownloadConfig`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use apod_downloader::downloader::{DateRange, DownloadConfig, DownloadExecutor};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(),
//! );
//! let config = DownloadConfig::new("DEMO_KEY", range, "apod_data.json");
//!
//! let summary = DownloadExecutor::new(config)?.execute().await;
//! println!("collected {} records", summary.collected);
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! Nothing inside a run is fatal. A date that cannot be fetched is logged and
//! left out of the output; a failed save is logged and the run still completes.
//! Only configuration problems (e.g. a missing API key) are surfaced as errors.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// CLI argument parsing and command execution
pub mod cli;

/// Date iteration, pacing and run orchestration
pub mod downloader;

/// Upstream API access with retry handling
pub mod fetcher;

/// Metrics emission
pub mod metrics;

/// Result persistence
pub mod output;

/// Cancellation shared between the signal handler and running downloads
pub mod shutdown;

/// One upstream response object, kept verbatim.
///
/// Fields are neither interpreted nor validated; key order is preserved when
/// the record is written back out.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Date format used by the upstream API and the CLI (`YYYY-MM-DD`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";
