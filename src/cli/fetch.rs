//! `apod-downloader` command line

use crate::downloader::config::{
    DEFAULT_BASE_URL, DEFAULT_END_DATE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_QUOTA_WAITS,
    DEFAULT_OUTPUT_FILE, DEFAULT_RATE_LIMIT_WAIT_SECS, DEFAULT_REQUEST_DELAY_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_START_DATE,
};
use crate::downloader::{DateRange, DownloadConfig, DownloadExecutor, RetryPolicy, RunSummary};
use crate::shutdown::SharedShutdown;
use chrono::NaiveDate;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::CliError;

/// Parse a `YYYY-MM-DD` date argument
fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), crate::DATE_FORMAT)
        .map_err(|e| format!("'{input}' is not a YYYY-MM-DD date: {e}"))
}

/// Output format for the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Download Astronomy Picture of the Day metadata for a date range
#[derive(Parser, Debug)]
#[command(name = "apod-downloader")]
#[command(about = "Download APOD metadata for a date range into a JSON file", long_about = None)]
#[command(version)]
pub struct Cli {
    /// API key (get one at https://api.nasa.gov)
    #[arg(long, env = "APOD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// APOD endpoint URL
    #[arg(long, env = "APOD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// First date to fetch (YYYY-MM-DD)
    #[arg(
        long,
        env = "APOD_START_DATE",
        default_value = DEFAULT_START_DATE,
        value_parser = parse_date
    )]
    pub start_date: NaiveDate,

    /// Last date to fetch, inclusive (YYYY-MM-DD)
    #[arg(
        long,
        env = "APOD_END_DATE",
        default_value = DEFAULT_END_DATE,
        value_parser = parse_date
    )]
    pub end_date: NaiveDate,

    /// Output JSON file (overwritten)
    #[arg(long, short = 'o', env = "APOD_OUTPUT", default_value = DEFAULT_OUTPUT_FILE)]
    pub output: PathBuf,

    /// Requests per date when rate limited with HTTP 429 (1-20)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub max_attempts: u32,

    /// Seconds to wait after a 429, or after an exhausted quota without Retry-After
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_WAIT_SECS)]
    pub rate_limit_wait: u64,

    /// Quota-exhaustion waits allowed per date
    #[arg(long, default_value_t = DEFAULT_MAX_QUOTA_WAITS)]
    pub max_quota_waits: u32,

    /// Seconds to pause after every date
    #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_SECS)]
    pub request_delay: u64,

    /// Per-request timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Pretty-print the output file
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Summary format (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Build the run configuration.
    ///
    /// Fails when the API key is missing or blank.
    pub fn to_config(&self) -> Result<DownloadConfig, CliError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::ConfigurationError(
                    "missing API key: pass --api-key or set APOD_API_KEY".to_string(),
                )
            })?;

        if self.start_date > self.end_date {
            warn!(
                start = %self.start_date,
                end = %self.end_date,
                "Start date is after end date, nothing will be fetched"
            );
        }

        let retry = RetryPolicy {
            max_attempts: self.max_attempts,
            rate_limit_wait: Duration::from_secs(self.rate_limit_wait),
            max_quota_waits: self.max_quota_waits,
        };

        Ok(DownloadConfig::new(
            api_key,
            DateRange::new(self.start_date, self.end_date),
            self.output.clone(),
        )
        .with_base_url(self.base_url.clone())
        .with_retry_policy(retry)
        .with_request_delay(Duration::from_secs(self.request_delay))
        .with_request_timeout(Duration::from_secs(self.timeout))
        .with_pretty(self.pretty))
    }

    /// Run the download and print the summary.
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<RunSummary, CliError> {
        let config = self.to_config()?;

        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .map_err(|e| CliError::ConfigurationError(e.to_string()))?;
        }

        let progress = create_progress_bar(config.range.len());
        let executor = DownloadExecutor::new(config)?
            .with_shutdown(shutdown)
            .with_progress(progress.clone());

        let summary = executor.execute().await;
        progress.finish_and_clear();

        info!(
            collected = summary.collected,
            failed = summary.failed_dates,
            saved = summary.saved,
            "Run finished"
        );

        match self.output_format {
            OutputFormat::Json => output_json(&summary)?,
            OutputFormat::Human => output_human(&summary),
        }

        Ok(summary)
    }
}

/// Progress bar on stderr, hidden when stderr is not a terminal.
fn create_progress_bar(days: usize) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(days as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} dates")
    {
        progress.set_style(style);
    }
    progress
}

fn output_json(summary: &RunSummary) -> Result<(), CliError> {
    let rendered = serde_json::to_string(summary)?;
    println!("{rendered}");
    Ok(())
}

fn output_human(summary: &RunSummary) {
    println!("\nAPOD download finished");
    println!("Dates requested: {}", summary.requested_dates);
    println!("Records collected: {}", summary.collected);
    if summary.failed_dates > 0 {
        println!("Dates failed: {}", summary.failed_dates);
    }
    if summary.saved {
        println!("Output: {}", summary.output_path.display());
    } else if let Some(err) = &summary.save_error {
        eprintln!("Save failed: {err}");
    } else {
        println!("Nothing saved");
    }
    if summary.interrupted {
        println!("Interrupted before the end of the range");
    }
}
