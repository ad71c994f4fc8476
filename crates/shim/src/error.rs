//! Shim Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the container, archive
//! and config crates are kept as children in the tree.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A shim error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for shim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a failure.
///
/// ### Operational Errors
/// - [`ErrorKind::Incompatible`]
/// - [`ErrorKind::MissingAttribute`]
/// - [`ErrorKind::InvalidAttribute`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Container`]
/// - [`ErrorKind::Archive`]
/// - [`ErrorKind::Config`]
/// - [`ErrorKind::Expand`], [`ErrorKind::Scan`], [`ErrorKind::Copy`] and
///   [`ErrorKind::Output`] wrap I/O or container failures with the path
///   involved.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Opening or reading a container failed.
    #[display("container operation failed")]
    Container,
    /// Opening or reading an input archive failed.
    #[display("archive operation failed: {}", _0.display())]
    Archive(#[error(not(source))] PathBuf),
    /// Settings failed validation.
    #[display("invalid configuration")]
    Config,
    /// A path could not be inspected for records for a reason other than "not
    /// a container".
    #[display("failed to expand {}", _0.display())]
    Expand(#[error(not(source))] PathBuf),
    /// Listing an input directory failed.
    #[display("failed to scan {}", _0.display())]
    Scan(#[error(not(source))] PathBuf),
    #[display("failed to copy {} to {}", from.display(), to.display())]
    Copy { from: PathBuf, to: PathBuf },
    /// Writing converter output failed.
    #[display("failed to write {}", _0.display())]
    Output(#[error(not(source))] PathBuf),
    /// A record lacks a tracking attribute the pipeline requires.
    #[display("missing attribute: {_0}")]
    MissingAttribute(#[error(not(source))] &'static str),
    /// A record attribute is present but unusable.
    #[display("invalid attribute: {_0}")]
    InvalidAttribute(#[error(not(source))] &'static str),
    /// The container library is older than the configured minimum.
    #[display("container library {found} is older than the required {required}")]
    Incompatible { found: String, required: String },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
