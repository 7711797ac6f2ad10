//! Download configuration and defaults

use crate::downloader::DateRange;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Public APOD endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.nasa.gov/planetary/apod";

/// Total attempts per date when the API answers 429.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Wait between 429 attempts, and the fallback wait when a quota header
/// carries no `Retry-After`.
pub const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 10;

/// Connect and response timeout for a single request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Pause after every date, successful or not.
pub const DEFAULT_REQUEST_DELAY_SECS: u64 = 5;

/// Quota-exhaustion waits allowed per date before it is abandoned.
/// These do not consume the 429 attempt budget.
pub const DEFAULT_MAX_QUOTA_WAITS: u32 = 3;

/// Output file used when none is given.
pub const DEFAULT_OUTPUT_FILE: &str = "apod_data.json";

/// First day of the default range.
pub const DEFAULT_START_DATE: &str = "2020-01-01";

/// Last day of the default range.
pub const DEFAULT_END_DATE: &str = "2020-01-10";

/// Retry behaviour for a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts when rate limited with HTTP 429 (including the first)
    pub max_attempts: u32,
    /// Fixed wait between 429 attempts; also the quota fallback wait
    pub rate_limit_wait: Duration,
    /// Bound on `X-RateLimit-Remaining: 0` waits for one date
    pub max_quota_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_wait: Duration::from_secs(DEFAULT_RATE_LIMIT_WAIT_SECS),
            max_quota_waits: DEFAULT_MAX_QUOTA_WAITS,
        }
    }
}

/// Everything a run needs, built once at startup and passed down.
#[derive(Clone)]
pub struct DownloadConfig {
    /// API credential sent as the `api_key` query parameter
    pub api_key: String,
    /// Endpoint URL
    pub base_url: String,
    /// Inclusive date span to fetch
    pub range: DateRange,
    /// Destination JSON file (overwritten)
    pub output_path: PathBuf,
    /// Per-date retry behaviour
    pub retry: RetryPolicy,
    /// Pause after each date
    pub request_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Pretty-print the output file
    pub pretty: bool,
}

impl DownloadConfig {
    /// Create a configuration with default endpoint, pacing and retry policy.
    pub fn new(
        api_key: impl Into<String>,
        range: DateRange,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            range,
            output_path: output_path.into(),
            retry: RetryPolicy::default(),
            request_delay: Duration::from_secs(DEFAULT_REQUEST_DELAY_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            pretty: false,
        }
    }

    /// Override the endpoint URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the pause between dates
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Override the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable pretty-printed output
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl fmt::Debug for DownloadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("range", &self.range)
            .field("output_path", &self.output_path)
            .field("retry", &self.retry)
            .field("request_delay", &self.request_delay)
            .field("request_timeout", &self.request_timeout)
            .field("pretty", &self.pretty)
            .finish()
    }
}
