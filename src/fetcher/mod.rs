//! Upstream APOD API access

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

pub mod apod;
pub mod apod_http;
pub mod retry_formatter;

pub use apod::ApodFetcher;
pub use apod_http::ApodHttpClient;
pub use retry_formatter::{RetryContext, RetryErrorType};

/// Fetcher errors
///
/// Every variant is terminal for the date being fetched. Callers of
/// [`ApodFetcher::fetch`] only see these in log output.
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Every attempt was answered with HTTP 429
    #[error("rate limit still exceeded after {attempts} attempts")]
    RateLimitExhausted {
        /// Attempts made
        attempts: u32,
    },

    /// Quota header stayed at zero for every allowed wait
    #[error("API quota still exhausted after {waits} waits")]
    QuotaExhausted {
        /// Waits performed
        waits: u32,
    },

    /// Non-success status other than 429
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// Response status
        status: StatusCode,
        /// Response body, possibly empty
        body: String,
    },

    /// Timeout, connection or other transport failure
    #[error("{}: {message}", .kind.description())]
    Network {
        /// Classification used for log messages
        kind: RetryErrorType,
        /// Underlying error text
        message: String,
    },

    /// Response body was not a JSON object
    #[error("parse error: {0}")]
    Parse(String),

    /// Shutdown was requested while waiting
    #[error("cancelled by shutdown request")]
    Cancelled,

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl FetcherError {
    /// Classification of this error for retry and failure messages
    pub fn error_type(&self) -> RetryErrorType {
        match self {
            FetcherError::RateLimitExhausted { .. } => RetryErrorType::RateLimit,
            FetcherError::QuotaExhausted { .. } => RetryErrorType::QuotaExhausted,
            FetcherError::HttpStatus { status, .. } => {
                retry_formatter::extract_error_type(Some(*status), None)
            }
            FetcherError::Network { kind, .. } => *kind,
            FetcherError::Parse(_) => RetryErrorType::InvalidPayload,
            FetcherError::Cancelled | FetcherError::ClientBuild(_) => {
                RetryErrorType::NetworkGeneric
            }
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// One raw response from the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Parsed `X-RateLimit-Remaining` header
    pub rate_limit_remaining: Option<u64>,
    /// Parsed `Retry-After` header (integer seconds only)
    pub retry_after: Option<Duration>,
    /// Raw body text
    pub body: String,
}

impl UpstreamResponse {
    /// Response with the given status and body and no rate-limit headers
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            rate_limit_remaining: None,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attach an `X-RateLimit-Remaining` value
    pub fn with_remaining(mut self, remaining: u64) -> Self {
        self.rate_limit_remaining = Some(remaining);
        self
    }

    /// Attach a `Retry-After` value
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Whether the quota header reports nothing left
    pub fn quota_exhausted(&self) -> bool {
        self.rate_limit_remaining == Some(0)
    }
}

/// Transport for a single per-date request.
///
/// [`ApodHttpClient`] is the production implementation; the retry policy in
/// [`ApodFetcher`] only depends on this trait.
#[async_trait]
pub trait ApodTransport: Send + Sync {
    /// Issue one GET for `date` (`YYYY-MM-DD`).
    ///
    /// Any HTTP status is returned as `Ok`; `Err` is reserved for failures
    /// where no response was received.
    async fn get_date(&self, date: &str) -> FetcherResult<UpstreamResponse>;

    /// Endpoint this transport talks to
    fn base_url(&self) -> &str;
}
