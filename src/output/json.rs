//! JSON array output
//!
//! The whole result set is serialized into memory and written to a temporary
//! file next to the target, which is then renamed over it. A crash mid-write
//! leaves the previous file (or nothing) in place, never a truncated array.
//!
//! The replacement keeps the mode of the file it replaces; a new file gets the
//! usual `0o666` minus umask. A symlinked target is written through, not
//! replaced.

#[cfg(unix)]
use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{OutputError, OutputResult, RecordsWriter};
use crate::Record;

/// Writes records as a single JSON array, overwriting the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArrayWriter {
    pretty: bool,
}

impl JsonArrayWriter {
    /// Compact writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable pretty printing
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    fn serialize(&self, records: &[Record]) -> OutputResult<Vec<u8>> {
        let result = if self.pretty {
            serde_json::to_vec_pretty(records)
        } else {
            serde_json::to_vec(records)
        };
        result.map_err(|e| OutputError::SerializationError(e.to_string()))
    }
}

impl RecordsWriter for JsonArrayWriter {
    fn write_records(&self, records: &[Record], path: &Path) -> OutputResult<()> {
        debug!(path = %path.display(), records = records.len(), "Writing JSON output");

        let json = self.serialize(records)?;

        let target = resolve_target(path);
        let path = target.as_path();
        let existing = std::fs::metadata(path).ok().map(|meta| meta.permissions());

        let parent_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent_dir).map_err(|e| {
            OutputError::IoError(format!(
                "Failed to create directory {}: {e}",
                parent_dir.display()
            ))
        })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(".apod").suffix(".tmp");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Umask is applied on creation, as for a plain create.
            builder.permissions(Permissions::from_mode(0o666));
        }
        let mut temp_file = builder
            .tempfile_in(parent_dir)
            .map_err(|e| OutputError::IoError(format!("Failed to create temp file: {e}")))?;

        if let Some(permissions) = existing {
            temp_file.as_file().set_permissions(permissions).map_err(|e| {
                OutputError::IoError(format!("Failed to set temp file permissions: {e}"))
            })?;
        }

        temp_file
            .write_all(&json)
            .map_err(|e| OutputError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| OutputError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync temp file: {e}")))?;

        temp_file.persist(path).map_err(|e| {
            OutputError::IoError(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;

        Ok(())
    }
}

/// Follow a symlink at `path` so the rename replaces the file it points to.
fn resolve_target(path: &Path) -> PathBuf {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}
