//! Error types for Vidshelf core operations.
//!
//! Errors are grouped by the subsystem that produced them. Most of them never
//! leave the component that raised them: the index adapter, filters and the
//! result cache log and degrade to "empty" or "miss". The one error that is
//! meant to travel up to the caller is [`IndexError::PermissionDenied`].

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to the media index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The caller lacks read access to the index.
    #[error("Permission denied while querying the media index: {reason}")]
    PermissionDenied {
        /// Explanation from the index provider.
        reason: String,
    },

    /// The index could not answer right now.
    #[error("Media index unavailable: {reason}")]
    Unavailable {
        /// Explanation from the index provider.
        reason: String,
    },

    /// A query targeted a storage volume the index does not know.
    #[error("Unknown storage volume: {volume}")]
    VolumeNotFound {
        /// Volume name that was requested.
        volume: String,
    },
}

/// Errors raised by the on-disk result cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be prepared.
    #[error("Cache initialization failed: {reason}")]
    InitializationFailed {
        /// Why initialization failed.
        reason: String,
    },

    /// A snapshot file exists but could not be decoded.
    #[error("Corrupted cache snapshot at {path}: {reason}")]
    Corrupted {
        /// Snapshot file.
        path: PathBuf,
        /// Decoder message.
        reason: String,
    },

    /// A snapshot was written by an incompatible format version.
    #[error("Cache snapshot version {found} does not match expected {expected}")]
    VersionMismatch {
        /// Version stored in the file.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
}

/// File system errors with the path that caused them.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// Reading a file failed.
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// File path.
        path: PathBuf,
        /// Underlying error message.
        reason: String,
    },

    /// Writing a file failed.
    #[error("Failed to write {path}: {reason}")]
    WriteFailed {
        /// File path.
        path: PathBuf,
        /// Underlying error message.
        reason: String,
    },

    /// Creating a directory failed.
    #[error("Failed to create directory {path}: {reason}")]
    CreateDirFailed {
        /// Directory path.
        path: PathBuf,
        /// Underlying error message.
        reason: String,
    },

    /// Renaming a file over its destination failed.
    #[error("Failed to rename {from} to {to}: {reason}")]
    RenameFailed {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Underlying error message.
        reason: String,
    },

    /// A path was expected to exist.
    #[error("Path not found: {path}")]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },
}

/// Errors that can occur in Vidshelf core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Media index failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Result cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// File system failure.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Access to the index was refused.
    Permission,
    /// Any other index failure.
    Index,
    /// Cache failure.
    Cache,
    /// File system or IO failure.
    FileSystem,
    /// Invalid configuration.
    Configuration,
    /// JSON encode/decode failure.
    Serialization,
}

impl Error {
    /// Shorthand for a permission failure.
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::Index(IndexError::PermissionDenied {
            reason: reason.into(),
        })
    }

    /// Shorthand for a transient index failure.
    pub fn index_unavailable(reason: impl Into<String>) -> Self {
        Self::Index(IndexError::Unavailable {
            reason: reason.into(),
        })
    }

    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Index(IndexError::PermissionDenied { .. }) => ErrorKind::Permission,
            Self::Index(_) => ErrorKind::Index,
            Self::Cache(_) => ErrorKind::Cache,
            Self::FileSystem(_) | Self::Io(_) => ErrorKind::FileSystem,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether this error means the caller has no access to the index.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self.kind(), ErrorKind::Permission)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_kind() {
        let err = Error::permission_denied("READ_MEDIA_VIDEO not granted");
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("READ_MEDIA_VIDEO"));
    }

    #[test]
    fn test_unavailable_is_not_permission() {
        let err = Error::index_unavailable("provider restarting");
        assert_eq!(err.kind(), ErrorKind::Index);
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn test_cache_error_display() {
        let err = Error::Cache(CacheError::VersionMismatch {
            found: 2,
            expected: 1,
        });
        assert_eq!(
            err.to_string(),
            "Cache snapshot version 2 does not match expected 1"
        );
        assert_eq!(err.kind(), ErrorKind::Cache);
    }

    #[test]
    fn test_file_system_error_display() {
        let err = Error::FileSystem(FileSystemError::WriteFailed {
            path: PathBuf::from("/cache/video_list_ab.json"),
            reason: "disk full".to_string(),
        });
        assert!(err.to_string().contains("/cache/video_list_ab.json"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }
}
