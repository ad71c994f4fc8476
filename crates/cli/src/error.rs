//! CLI Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings could not be loaded.
    #[display("failed to load configuration")]
    Config,
    /// The container library is too old to run at all.
    #[display("incompatible container library")]
    Incompatible,
    /// The session could not be set up for another reason.
    #[display("failed to start session")]
    Session,
    #[display("conversion failed")]
    Convert,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
