//! CLI error types and conversions

use crate::downloader::DownloadError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Download setup error
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Run summary could not be rendered
    #[error("failed to render summary: {0}")]
    SummaryError(#[from] serde_json::Error),
}
