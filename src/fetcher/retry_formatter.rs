//! Retry message formatting for the APOD fetcher.
//!
//! Keeps warning and failure log lines consistent across the 429, quota and
//! transport branches of the retry loop.

use reqwest::{Error as ReqwestError, StatusCode};
use std::time::Duration;

/// Classification of fetch failures for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or connect timeout
    NetworkTimeout,
    /// Connection refused, DNS failure or similar
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// `X-RateLimit-Remaining: 0`
    QuotaExhausted,
    /// HTTP 5xx
    ServerError(u16),
    /// HTTP 400, usually a date outside the archive
    InvalidRequest,
    /// HTTP 401/403
    AuthFailed(u16),
    /// Other 4xx
    ClientError(u16),
    /// Body was not a JSON object
    InvalidPayload,
    /// Anything else
    NetworkGeneric,
}

impl RetryErrorType {
    /// Short description used inside log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::QuotaExhausted => "API quota exhausted",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::InvalidRequest => "invalid request",
            Self::AuthFailed(_) => "authentication failed",
            Self::ClientError(code) => match code {
                404 => "resource not found",
                _ => "client error",
            },
            Self::InvalidPayload => "invalid response payload",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Suggested remediation shown with final failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection or raise --timeout",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit | Self::QuotaExhausted => {
                "Raise --request-delay or use a personal API key instead of DEMO_KEY"
            }
            Self::ServerError(_) => "The API may be having issues, try again later",
            Self::InvalidRequest => "Check that the date lies within the APOD archive",
            Self::AuthFailed(_) => "Verify the API key",
            Self::ClientError(_) => "Review the endpoint URL and request parameters",
            Self::InvalidPayload => "Check that --base-url points at the APOD endpoint",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }
}

/// Context for one retry or failure message.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Date being fetched (`YYYY-MM-DD`)
    pub date: String,
    /// Current attempt or wait number (1-based)
    pub attempt: u32,
    /// Configured maximum for this kind of retry
    pub max_attempts: u32,
    /// What triggered the retry
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub wait: Duration,
}

impl RetryContext {
    /// Build a context for `date`.
    pub fn new(
        date: impl Into<String>,
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        wait: Duration,
    ) -> Self {
        Self {
            date: date.into(),
            attempt,
            max_attempts,
            error_type,
            wait,
        }
    }

    /// Message logged before waiting.
    pub fn format_retry(&self) -> String {
        format!(
            "{} for date {}. Retrying in {:.0} seconds... (Attempt {}/{})",
            capitalize(self.error_type.description()),
            self.date,
            self.wait.as_secs_f64(),
            self.attempt,
            self.max_attempts
        )
    }

    /// Message logged when the date is given up.
    pub fn format_failure(&self, error: &str) -> String {
        format!(
            "[FAILED] date {} after {} attempt(s): {} ({})",
            self.date,
            self.attempt,
            error,
            self.error_type.suggestion()
        )
    }
}

/// Classify an HTTP status or reqwest error.
pub fn extract_error_type(
    status: Option<StatusCode>,
    err: Option<&ReqwestError>,
) -> RetryErrorType {
    if let Some(status) = status {
        match status.as_u16() {
            400 => return RetryErrorType::InvalidRequest,
            401 | 403 => return RetryErrorType::AuthFailed(status.as_u16()),
            429 => return RetryErrorType::RateLimit,
            _ => {}
        }

        if status.is_server_error() {
            return RetryErrorType::ServerError(status.as_u16());
        }

        if status.is_client_error() {
            return RetryErrorType::ClientError(status.as_u16());
        }
    }

    if let Some(err) = err {
        if err.is_timeout() {
            return RetryErrorType::NetworkTimeout;
        }

        if err.is_connect() {
            return RetryErrorType::NetworkOffline;
        }
    }

    RetryErrorType::NetworkGeneric
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
