//! Run metrics for the APOD downloader
//!
//! Emits counters and histograms through the `metrics` facade. Nothing is
//! recorded unless a recorder is installed; [`init_metrics`] installs a
//! Prometheus exporter with a scrape endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Address the exporter was bound to, set once
static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

/// Errors from metrics setup
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter: {0}")]
    Install(String),
}

/// Install the Prometheus exporter on `addr`.
///
/// Idempotent: later calls are no-ops and keep the first address. Must be
/// called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if let Some(existing) = METRICS_ADDR.get() {
        debug!("Metrics already initialized on {}, skipping", existing);
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_counter!(
        "apod_requests_total",
        Unit::Count,
        "HTTP requests made to the APOD API"
    );
    describe_counter!(
        "apod_rate_limited_total",
        Unit::Count,
        "Responses that triggered a rate-limit wait"
    );
    describe_counter!("apod_retries_total", Unit::Count, "Retry waits performed");
    describe_counter!(
        "apod_dates_total",
        Unit::Count,
        "Dates processed, labelled by outcome"
    );
    describe_histogram!(
        "apod_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration"
    );

    let _ = METRICS_ADDR.set(addr);
    info!("Metrics endpoint listening on {}", addr);
    Ok(())
}

/// Timing for a single HTTP request
pub struct HttpRequestMetrics {
    date: String,
    start_time: Instant,
}

impl HttpRequestMetrics {
    /// Start timing a request for `date`
    pub fn start(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!("apod_requests_total", "status" => status_code.to_string()).increment(1);
        histogram!("apod_request_duration_seconds").record(duration.as_secs_f64());

        debug!(
            date = %self.date,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record a request that produced no response
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!("apod_requests_total", "status" => "network_error").increment(1);
        histogram!("apod_request_duration_seconds").record(duration.as_secs_f64());

        debug!(
            date = %self.date,
            duration_ms = duration.as_millis() as u64,
            "HTTP request failed without response"
        );
    }
}

/// Why the fetcher is waiting before another try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// HTTP 429
    TooManyRequests,
    /// `X-RateLimit-Remaining: 0`
    QuotaExhausted,
}

impl RateLimitReason {
    fn label(&self) -> &'static str {
        match self {
            RateLimitReason::TooManyRequests => "too_many_requests",
            RateLimitReason::QuotaExhausted => "quota_exhausted",
        }
    }
}

/// Record a rate-limit wait
pub fn record_retry_wait(reason: RateLimitReason, wait: Duration) {
    counter!("apod_rate_limited_total", "reason" => reason.label()).increment(1);
    counter!("apod_retries_total").increment(1);

    debug!(
        reason = reason.label(),
        wait_ms = wait.as_millis() as u64,
        "Retry wait recorded"
    );
}

/// Final outcome for one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOutcome {
    /// Record collected
    Collected,
    /// Date abandoned
    Failed,
}

/// Record the outcome for one date
pub fn record_date_outcome(outcome: DateOutcome) {
    let label = match outcome {
        DateOutcome::Collected => "collected",
        DateOutcome::Failed => "failed",
    };
    counter!("apod_dates_total", "outcome" => label).increment(1);
}
