//! Atomic file writes
//!
//! Durable documents are written to a sibling `.tmp` file and renamed over the
//! target, so a concurrent reader sees either the old or the new content.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Path of the temporary sibling used while writing `target`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Write `contents` to `target` via write-temp-then-rename
///
/// Creates the parent directory if it is missing. On failure the temporary file
/// is removed (best-effort) and the target is left untouched.
pub fn write_atomic(target: &Path, contents: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("No parent directory: {}", target.display())))?;
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path_for(target);
    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    if let Err(e) = std::fs::rename(&tmp, target) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::trace!(path = %target.display(), bytes = contents.len(), "Atomic write complete");
    Ok(())
}
