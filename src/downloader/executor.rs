//! Run orchestration: collect the range, then save it if anything came back

use indicatif::ProgressBar;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::downloader::{Collection, DownloadConfig, DownloadError, RangeCollector};
use crate::fetcher::{ApodFetcher, ApodHttpClient, ApodTransport};
use crate::output::{JsonArrayWriter, RecordsWriter};
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Days in the requested range
    pub requested_dates: usize,
    /// Records collected
    pub collected: usize,
    /// Dates that produced no record
    pub failed_dates: usize,
    /// Destination file
    pub output_path: PathBuf,
    /// Whether the file was written during this run
    pub saved: bool,
    /// Save failure, if the save was attempted and failed
    pub save_error: Option<String>,
    /// Whether a shutdown request cut the run short
    pub interrupted: bool,
}

/// Runs Collect → (Save if non-empty) → Done.
pub struct DownloadExecutor {
    config: DownloadConfig,
    transport: Arc<dyn ApodTransport>,
    writer: Box<dyn RecordsWriter>,
    shutdown: SharedShutdown,
    progress: Option<ProgressBar>,
}

impl DownloadExecutor {
    /// Create an executor that talks to the configured endpoint over HTTP.
    pub fn new(config: DownloadConfig) -> Result<Self, DownloadError> {
        if config.api_key.trim().is_empty() {
            return Err(DownloadError::ConfigurationError(
                "API key must not be empty".to_string(),
            ));
        }

        let transport = ApodHttpClient::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )
        .map_err(|e| DownloadError::ClientError(e.to_string()))?;

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create an executor over a caller-supplied transport.
    pub fn with_transport(config: DownloadConfig, transport: Arc<dyn ApodTransport>) -> Self {
        let writer = Box::new(JsonArrayWriter::new().pretty(config.pretty));
        Self {
            config,
            transport,
            writer,
            shutdown: ShutdownCoordinator::shared(),
            progress: None,
        }
    }

    /// Replace the output writer
    pub fn with_writer(mut self, writer: Box<dyn RecordsWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Share a shutdown coordinator with the signal handler
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Tick `progress` once per date
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Execute the run. Failures are logged and reflected in the summary.
    pub async fn execute(&self) -> RunSummary {
        info!(
            range = %self.config.range,
            output = %self.config.output_path.display(),
            "Starting APOD download"
        );

        let fetcher = ApodFetcher::new(self.transport.clone(), self.config.retry)
            .with_shutdown(self.shutdown.clone());
        let mut collector = RangeCollector::new(fetcher, self.config.request_delay)
            .with_shutdown(self.shutdown.clone());
        if let Some(progress) = &self.progress {
            collector = collector.with_progress(progress.clone());
        }

        let Collection {
            records,
            failed_dates,
            interrupted,
        } = collector.collect(&self.config.range).await;

        let mut summary = RunSummary {
            requested_dates: self.config.range.len(),
            collected: records.len(),
            failed_dates,
            output_path: self.config.output_path.clone(),
            saved: false,
            save_error: None,
            interrupted,
        };

        if records.is_empty() {
            info!("No data collected, nothing to save");
        } else {
            match self.writer.write_records(&records, &self.config.output_path) {
                Ok(()) => {
                    info!(
                        path = %self.config.output_path.display(),
                        records = records.len(),
                        "JSON file saved successfully: {}",
                        self.config.output_path.display()
                    );
                    summary.saved = true;
                }
                Err(e) => {
                    error!(
                        path = %self.config.output_path.display(),
                        "Error saving JSON file: {}",
                        e
                    );
                    summary.save_error = Some(e.to_string());
                }
            }
        }

        info!("Task complete");
        summary
    }
}
