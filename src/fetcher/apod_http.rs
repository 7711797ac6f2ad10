//! APOD HTTP client
//!
//! Issues one GET per date with the `api_key` and `date` query parameters and
//! hands the raw response back to the fetcher. Retry decisions are not made
//! here; this layer only extracts the status, rate-limit headers and body.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::fetcher::retry_formatter::extract_error_type;
use crate::fetcher::{ApodTransport, FetcherError, FetcherResult, UpstreamResponse};
use crate::metrics::HttpRequestMetrics;

/// Header carrying the remaining hourly quota
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// Header carrying the server-suggested wait in seconds
pub const RETRY_AFTER_HEADER: &str = "Retry-After";

/// reqwest-backed [`ApodTransport`].
pub struct ApodHttpClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApodHttpClient {
    /// Create a client with the given per-request timeout.
    ///
    /// The timeout applies to both connecting and the whole response.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> FetcherResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("apod-downloader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetcherError::ClientBuild(e.to_string()))?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ApodTransport for ApodHttpClient {
    async fn get_date(&self, date: &str) -> FetcherResult<UpstreamResponse> {
        let metrics = HttpRequestMetrics::start(date);
        debug!(date = %date, url = %self.base_url, "Requesting APOD entry");

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[("api_key", self.api_key.as_str()), ("date", date)])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                metrics.record_network_error();
                return Err(FetcherError::Network {
                    kind: extract_error_type(None, Some(&e)),
                    message: e.without_url().to_string(),
                });
            }
        };

        let status = response.status();
        let headers = response.headers().clone();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                metrics.record_network_error();
                return Err(FetcherError::Network {
                    kind: extract_error_type(None, Some(&e)),
                    message: format!("failed to read response body: {}", e.without_url()),
                });
            }
        };
        metrics.record_complete(status.as_u16());

        Ok(UpstreamResponse {
            status,
            rate_limit_remaining: parse_rate_limit_remaining(&headers),
            retry_after: parse_retry_after(&headers),
            body,
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Parse `X-RateLimit-Remaining`.
///
/// Returns `None` when the header is absent or not an integer.
pub fn parse_rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(RATE_LIMIT_REMAINING_HEADER)?.to_str().ok()?;

    match value.trim().parse::<u64>() {
        Ok(remaining) => {
            debug!("Rate limit remaining: {}", remaining);
            Some(remaining)
        }
        Err(e) => {
            warn!("Failed to parse {} header '{}': {}", RATE_LIMIT_REMAINING_HEADER, value, e);
            None
        }
    }
}

/// Parse `Retry-After` as whole seconds.
///
/// HTTP-date values are not supported and yield `None`, which makes the
/// fetcher fall back to its default wait.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER_HEADER)?.to_str().ok()?;

    match value.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!("Ignoring non-numeric {} header '{}'", RETRY_AFTER_HEADER, value);
            None
        }
    }
}
