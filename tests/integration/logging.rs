//! Integration tests for logging and tracing

use apod_downloader::downloader::{DateRange, DownloadConfig, DownloadExecutor, RetryPolicy};
use apod_downloader::fetcher::{ApodFetcher, ApodTransport};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::common::{closed_port_url, date, LogCapture, Reply, ScriptedTransport};

/// Subscriber built the way `main` builds it, writing into `capture`.
fn filtered_subscriber(capture: &LogCapture, directives: &str, json: bool) -> tracing::Dispatch {
    let writer = capture.clone();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_ansi(false)
        .with_writer(move || writer.clone());
    if json {
        tracing::Dispatch::new(builder.json().finish())
    } else {
        tracing::Dispatch::new(builder.finish())
    }
}

#[test]
fn test_env_filter_drops_events_below_level() {
    let logs = LogCapture::new();
    let dispatch = filtered_subscriber(&logs, "apod_downloader=warn", false);
    let _guard = tracing::dispatcher::set_default(&dispatch);

    info!(target: "apod_downloader::downloader", "Collected APOD entry");
    warn!(target: "apod_downloader::downloader", "Rate limited");
    warn!(target: "other_crate", "Unrelated warning");

    let output = logs.contents();
    assert!(!output.contains("Collected APOD entry"));
    assert!(output.contains("Rate limited"));
    assert!(!output.contains("Unrelated warning"));
}

#[test]
fn test_json_format_emits_one_object_per_event() {
    let logs = LogCapture::new();
    let dispatch = filtered_subscriber(&logs, "apod_downloader=info", true);
    let _guard = tracing::dispatcher::set_default(&dispatch);

    info!(target: "apod_downloader::downloader", date = "2020-01-01", "Task complete");

    let output = logs.contents();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1);

    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["target"], "apod_downloader::downloader");
    assert_eq!(event["fields"]["message"], "Task complete");
    assert_eq!(event["fields"]["date"], "2020-01-01");
}

#[test]
fn test_structured_fields_are_rendered() {
    let logs = LogCapture::new();
    let _guard = logs.install();

    info!(date = "2020-01-01", collected = 3, "Collected APOD entry");
    warn!(date = "2020-01-02", "Rate limited");

    let output = logs.contents();
    assert!(output.contains("Collected APOD entry"));
    assert!(output.contains("date=\"2020-01-01\"") || output.contains("date=2020-01-01"));
    assert!(output.contains("collected=3"));
    assert!(output.contains("WARN"));
}

#[tokio::test(start_paused = true)]
async fn test_run_logs_retries_failures_and_completion() {
    let logs = LogCapture::new();
    let _guard = logs.install();
    let dir = TempDir::new().unwrap();
    let transport: Arc<dyn ApodTransport> = ScriptedTransport::new()
        .script("2020-01-02", vec![Reply::too_many_requests()])
        .shared();
    let config = DownloadConfig::new(
        "test-key",
        DateRange::new(date(2020, 1, 1), date(2020, 1, 2)),
        dir.path().join("apod_data.json"),
    );

    DownloadExecutor::with_transport(config, transport)
        .execute()
        .await;

    let output = logs.contents();
    assert!(output.contains(
        "Rate limit exceeded for date 2020-01-02. Retrying in 10 seconds... (Attempt 1/3)"
    ));
    assert!(output.contains("(Attempt 2/3)"));
    assert!(!output.contains("(Attempt 3/3)"));
    assert!(output.contains("Error retrieving data for date: 2020-01-02"));
    assert!(output.contains("JSON file saved successfully"));
    assert!(output.contains("Task complete"));
}

#[tokio::test]
async fn test_api_key_never_reaches_logs() {
    let logs = LogCapture::new();
    let _guard = logs.install();
    let dir = TempDir::new().unwrap();
    let secret = "super-secret-key-123";
    let config = DownloadConfig::new(
        secret,
        DateRange::new(date(2020, 1, 1), date(2020, 1, 1)),
        dir.path().join("apod_data.json"),
    )
    .with_base_url(closed_port_url().await)
    .with_request_delay(Duration::ZERO)
    .with_retry_policy(RetryPolicy::default());

    // Debug output of the config is redacted as well.
    tracing::debug!(config = ?config, "Starting");

    let summary = DownloadExecutor::new(config).unwrap().execute().await;

    assert_eq!(summary.failed_dates, 1);
    let output = logs.contents();
    assert!(output.contains("<redacted>"));
    assert!(output.contains("Error retrieving data for date: 2020-01-01"));
    assert!(!output.contains(secret));
}

#[tokio::test(start_paused = true)]
async fn test_failure_line_counts_every_request() {
    let logs = LogCapture::new();
    let _guard = logs.install();
    let transport: Arc<dyn ApodTransport> = ScriptedTransport::new()
        .script(
            "2020-01-01",
            vec![
                Reply::too_many_requests(),
                Reply::too_many_requests(),
                Reply::status(500),
            ],
        )
        .script("2020-01-02", vec![Reply::quota_exhausted("2020-01-02", Some(1))])
        .shared();
    let fetcher = ApodFetcher::new(transport, RetryPolicy::default());

    assert!(fetcher.fetch(date(2020, 1, 1)).await.is_none());
    assert!(fetcher.fetch(date(2020, 1, 2)).await.is_none());

    let output = logs.contents();
    assert!(output.contains("[FAILED] date 2020-01-01 after 3 attempt(s)"));
    assert!(output.contains("[FAILED] date 2020-01-02 after 4 attempt(s)"));
}
