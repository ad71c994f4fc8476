//! Container Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::{Path, PathBuf};

/// A container error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// The split that matters most to callers is between [`Format`](Self::Format)
/// (the bytes are not a container this format understands) and everything
/// I/O related. Speculative opening treats the former as "not a container"
/// and the latter as a genuine failure.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// File does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error")]
    Io,
    /// Not a container of this format, or a corrupted one.
    #[display("not a valid container: {}", _0.display())]
    Format(#[error(not(source))] PathBuf),
    /// The container is valid but does not hold the requested record.
    #[display("record not found: {_0}")]
    MissingRecord(#[error(not(source))] String),
    /// The operation needs a different layout (e.g. asking a multi-record
    /// container for its single record).
    #[display("wrong container layout: expected {_0}")]
    Layout(#[error(not(source))] &'static str),
    /// Writing to the container failed after it was opened.
    #[display("failed to write container: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Map an I/O error raised while touching `path` to the matching kind.
    pub fn from_io(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            _ => Self::Io,
        }
    }

    /// Wrap an I/O error raised while touching `path`, keeping the original
    /// error as a child in the error tree.
    #[track_caller]
    pub fn io(err: std::io::Error, path: impl AsRef<Path>) -> Error {
        let kind = Self::from_io(&err, path.as_ref());
        exn::Exn::from(err).raise(kind)
    }

    /// Returns `true` when the failure means "these bytes are not a
    /// container", as opposed to being unable to read them at all.
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Layout(_))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(std::io::ErrorKind::NotFound, ErrorKind::NotFound(PathBuf::from("a.fast5")))]
    #[case(std::io::ErrorKind::PermissionDenied, ErrorKind::PermissionDenied(PathBuf::from("a.fast5")))]
    #[case(std::io::ErrorKind::UnexpectedEof, ErrorKind::Io)]
    fn test_from_io(#[case] kind: std::io::ErrorKind, #[case] expected: ErrorKind) {
        let err = std::io::Error::new(kind, "boom");
        assert_eq!(ErrorKind::from_io(&err, "a.fast5"), expected);
    }

    #[test]
    fn test_format_mismatch() {
        assert!(ErrorKind::Format(PathBuf::from("x")).is_format_mismatch());
        assert!(ErrorKind::Layout("single").is_format_mismatch());
        assert!(!ErrorKind::Io.is_format_mismatch());
        assert!(!ErrorKind::PermissionDenied(PathBuf::from("x")).is_format_mismatch());
        assert!(!ErrorKind::MissingRecord("r1".to_string()).is_format_mismatch());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::MissingRecord("abc".to_string()).to_string(), "record not found: abc");
        assert_eq!(ErrorKind::NotFound(PathBuf::from("x.fast5")).to_string(), "file not found: x.fast5");
    }
}
