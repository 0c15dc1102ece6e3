//! Replace-on-write for small files.
//!
//! The payload goes to a temporary sibling first and is renamed over the
//! target, so the target never holds a partial write.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, FileSystemError, Result};

/// Sequence for temporary file names, so concurrent writers never share one.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// What to do when the rename over the target fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenameFallback {
    /// Overwrite the target directly.
    WriteInPlace,
    /// Report the failure.
    Fail,
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        "{file_name}.{}.{}.tmp",
        std::process::id(),
        TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Write `payload` to `path` through a temporary file, creating the parent
/// directory when missing.
pub(crate) fn write_atomically(path: &Path, payload: &[u8], fallback: RenameFallback) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            Error::FileSystem(FileSystemError::CreateDirFailed {
                path: parent.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
    }

    let temp = temp_path(path);
    fs::write(&temp, payload).map_err(|e| {
        Error::FileSystem(FileSystemError::WriteFailed {
            path: temp.clone(),
            reason: e.to_string(),
        })
    })?;

    let Err(e) = fs::rename(&temp, path) else {
        return Ok(());
    };
    let _ = fs::remove_file(&temp);
    match fallback {
        RenameFallback::Fail => Err(Error::FileSystem(FileSystemError::RenameFailed {
            from: temp,
            to: path.to_path_buf(),
            reason: e.to_string(),
        })),
        RenameFallback::WriteInPlace => {
            tracing::debug!(
                "Rename of {} failed ({}), writing {} in place",
                temp.display(),
                e,
                path.display()
            );
            fs::write(path, payload).map_err(|e| {
                Error::FileSystem(FileSystemError::WriteFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            })
        }
    }
}
