//! Per-date APOD fetcher with rate-limit retries
//!
//! Retry rules for one date:
//! - HTTP 429: wait `rate_limit_wait` and try again, up to `max_attempts`
//!   requests in total.
//! - 2xx with `X-RateLimit-Remaining: 0`: wait `Retry-After` (or
//!   `rate_limit_wait`) and try again. These waits have their own bound,
//!   `max_quota_waits`, and do not use up 429 attempts.
//! - Any other status, a transport failure or an unparsable body abandons the
//!   date immediately.

use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::downloader::config::RetryPolicy;
use crate::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use crate::fetcher::{ApodTransport, FetcherError, FetcherResult, UpstreamResponse};
use crate::metrics::{self, RateLimitReason};
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};
use crate::Record;

/// Fetches one APOD record per call, applying the retry policy.
pub struct ApodFetcher {
    transport: Arc<dyn ApodTransport>,
    policy: RetryPolicy,
    shutdown: SharedShutdown,
}

impl ApodFetcher {
    /// Create a fetcher over `transport`.
    pub fn new(transport: Arc<dyn ApodTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            shutdown: ShutdownCoordinator::shared(),
        }
    }

    /// Share a shutdown coordinator so waits can be interrupted.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Fetch the record for `date`, or `None` if the date had to be abandoned.
    ///
    /// Never fails: every error is logged here and turned into `None`.
    pub async fn fetch(&self, date: NaiveDate) -> Option<Record> {
        let date_str = date.format(crate::DATE_FORMAT).to_string();

        let mut requests = 0;
        let result = self.fetch_counted(&date_str, &mut requests).await;
        match result {
            Ok(record) => Some(record),
            Err(FetcherError::Cancelled) => {
                warn!(date = %date_str, "Shutdown requested, abandoning date");
                None
            }
            Err(e) => {
                let ctx = RetryContext::new(
                    &date_str,
                    requests,
                    self.policy.max_attempts,
                    e.error_type(),
                    self.policy.rate_limit_wait,
                );
                error!(date = %date_str, "{}", ctx.format_failure(&e.to_string()));
                None
            }
        }
    }

    /// Fetch the record for `date_str`, reporting why it failed.
    pub async fn try_fetch(&self, date_str: &str) -> FetcherResult<Record> {
        let mut requests = 0;
        self.fetch_counted(date_str, &mut requests).await
    }

    /// Retry loop behind [`fetch`](Self::fetch) and [`try_fetch`](Self::try_fetch).
    ///
    /// `requests` counts every request sent for the date, whatever its outcome.
    async fn fetch_counted(&self, date_str: &str, requests: &mut u32) -> FetcherResult<Record> {
        let max_attempts = self.policy.max_attempts.max(1);
        // Requests answered with 429 so far; quota waits are counted apart.
        let mut rate_limited: u32 = 0;
        let mut quota_waits: u32 = 0;

        loop {
            if self.shutdown.is_shutdown_requested() {
                return Err(FetcherError::Cancelled);
            }

            *requests += 1;
            let response = self.transport.get_date(date_str).await?;

            if response.status.as_u16() == 429 {
                rate_limited += 1;
                if rate_limited >= max_attempts {
                    return Err(FetcherError::RateLimitExhausted {
                        attempts: rate_limited,
                    });
                }

                let wait = self.policy.rate_limit_wait;
                let ctx = RetryContext::new(
                    date_str,
                    rate_limited,
                    max_attempts,
                    RetryErrorType::RateLimit,
                    wait,
                );
                warn!(
                    date = %date_str,
                    attempt = rate_limited,
                    max_attempts,
                    "{}",
                    ctx.format_retry()
                );
                metrics::record_retry_wait(RateLimitReason::TooManyRequests, wait);

                if !self.shutdown.sleep(wait).await {
                    return Err(FetcherError::Cancelled);
                }
                continue;
            }

            if !response.status.is_success() {
                return Err(FetcherError::HttpStatus {
                    status: response.status,
                    body: response.body,
                });
            }

            if response.quota_exhausted() {
                if quota_waits >= self.policy.max_quota_waits {
                    return Err(FetcherError::QuotaExhausted { waits: quota_waits });
                }
                quota_waits += 1;

                let wait = response.retry_after.unwrap_or(self.policy.rate_limit_wait);
                let ctx = RetryContext::new(
                    date_str,
                    quota_waits,
                    self.policy.max_quota_waits,
                    RetryErrorType::QuotaExhausted,
                    wait,
                );
                warn!(date = %date_str, quota_waits, "{}", ctx.format_retry());
                metrics::record_retry_wait(RateLimitReason::QuotaExhausted, wait);

                if !self.shutdown.sleep(wait).await {
                    return Err(FetcherError::Cancelled);
                }
                continue;
            }

            debug!(date = %date_str, attempt = rate_limited + 1, "Fetched APOD entry");
            return parse_record(response);
        }
    }
}

/// Decode a successful body into a [`Record`].
fn parse_record(response: UpstreamResponse) -> FetcherResult<Record> {
    match serde_json::from_str::<Value>(&response.body) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(FetcherError::Parse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(FetcherError::Parse(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
