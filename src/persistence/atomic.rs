//! Atomic full-file replacement
//!
//! Writes go to a fresh temp file in the target's directory, are flushed to
//! disk, and land via a single atomic rename. A concurrent reader of the
//! target path sees either the old complete content or the new complete
//! content, never a mix; a crash before the rename leaves the original file
//! untouched.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{FlagFileError, Result};

/// Replace the file at `path` with `content`
///
/// The temp file must live in the same directory as the target so the final
/// rename stays on one filesystem. On any failure the original file is left
/// unchanged and the temp file is removed on drop. No retry happens here;
/// retry policy belongs to the caller.
///
/// # Errors
///
/// Returns [`FlagFileError::Persistence`] on any I/O failure (directory
/// creation, temp-file write, flush, or rename).
pub fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| {
        FlagFileError::Persistence(format!(
            "Failed to create directory {}: {}",
            parent.display(),
            e
        ))
    })?;

    let temp = NamedTempFile::new_in(parent).map_err(|e| {
        FlagFileError::Persistence(format!(
            "Failed to create temp file in {}: {}",
            parent.display(),
            e
        ))
    })?;

    let mut file = temp.as_file();
    file.write_all(content.as_bytes()).map_err(|e| {
        FlagFileError::Persistence(format!("Failed to write temp file for {}: {}", path.display(), e))
    })?;
    file.sync_all().map_err(|e| {
        FlagFileError::Persistence(format!("Failed to sync temp file for {}: {}", path.display(), e))
    })?;

    temp.persist(path).map_err(|e| {
        FlagFileError::Persistence(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;

    debug!(path = %path.display(), bytes = content.len(), "atomic write complete");
    Ok(())
}
