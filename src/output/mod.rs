//! Result persistence

use crate::Record;
use std::path::Path;

pub mod json;

pub use json::JsonArrayWriter;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes a complete set of records to a file in one shot.
pub trait RecordsWriter: Send + Sync {
    /// Replace the contents of `path` with `records`.
    fn write_records(&self, records: &[Record], path: &Path) -> OutputResult<()>;
}
