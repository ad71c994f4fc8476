//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::{Path, PathBuf};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Archive file does not exist.
    #[display("archive not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied.
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// The file is not a tar archive, or its compression layer is corrupt.
    /// Don't retry with the same input.
    #[display("invalid or corrupted archive: {}", _0.display())]
    InvalidArchive(#[error(not(source))] PathBuf),
    /// An archive entry could not be read.
    #[display("failed to read archive entry")]
    Entry,
    /// An I/O operation failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Pick the kind matching an I/O error raised while opening `path`.
    pub fn from_io(err: &std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io,
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Entry.to_string(), "failed to read archive entry");
        assert_eq!(
            ErrorKind::InvalidArchive(PathBuf::from("reads.tar.gz")).to_string(),
            "invalid or corrupted archive: reads.tar.gz"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::InvalidArchive(PathBuf::from("a.tar")).is_retryable());
        assert!(!ErrorKind::NotFound(PathBuf::from("a.tar")).is_retryable());
        assert!(ErrorKind::Io.is_retryable());
    }

    #[test]
    fn error_from_result() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));
        let path = Path::new("missing.tar");
        let err: Result<()> = result.or_raise(|| ErrorKind::NotFound(path.to_path_buf()));
        let exn = err.unwrap_err();
        assert_eq!(*exn, ErrorKind::NotFound(path.to_path_buf()));
    }
}
