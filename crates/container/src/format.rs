//! Container format traits.
//!
//! These are the seams where a concrete container library (HDF5-backed in
//! production) is plugged in. Everything above this crate talks to containers
//! exclusively through [`ContainerFormat`], [`Container`] and
//! [`ContainerWriter`], which is what lets the rest of the workspace swap in
//! alternate behaviour (cached bytes, virtual paths) without touching the
//! format implementation.

use crate::error::Result;
use crate::record::Record;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

/// Where container bytes come from.
#[derive(Clone, Debug)]
pub enum Source<'a> {
    /// A file on disk.
    Path(&'a Path),
    /// Bytes already held in memory (e.g. pulled out of an archive), along
    /// with the name they were stored under.
    Memory { name: &'a Path, bytes: Arc<[u8]> },
}

impl Source<'_> {
    /// Name of the source, for logging and error reporting.
    pub fn name(&self) -> &Path {
        match self {
            Source::Path(path) => path,
            Source::Memory { name, .. } => name,
        }
    }
}

/// How records are arranged inside a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Layout {
    /// Exactly one record; the legacy "one file = one read" representation.
    Single,
    /// Zero or more records, each stored as a prefixed top-level entry.
    Multi,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Single => "single",
            Layout::Multi => "multi",
        }
    }
}

impl Display for Layout {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// A container format implementation.
///
/// Implementations must be object safe; the rest of the workspace holds them
/// as [`FormatHandle`](crate::FormatHandle).
///
/// # Examples
///
/// ```
/// use multiread_container::{ContainerFormat, Source, error::Result};
/// use std::path::Path;
///
/// fn count_entries(format: &dyn ContainerFormat, path: &Path) -> Result<usize> {
///     let container = format.open(Source::Path(path))?;
///     Ok(container.keys()?.len())
/// }
/// ```
pub trait ContainerFormat: Send + Sync {
    /// Short name of the format, used for logging only.
    fn name(&self) -> &str;

    /// Version of the underlying container library. Checked against a
    /// configured minimum before any work starts.
    fn version(&self) -> &str;

    /// Open a container for reading.
    ///
    /// Returns [`Format`](crate::error::ErrorKind::Format) when the source is
    /// readable but is not a container of this format.
    fn open(&self, source: Source<'_>) -> Result<Box<dyn Container>>;

    /// Create a new, empty container at `path`, replacing any existing file.
    fn create(&self, path: &Path, layout: Layout) -> Result<Box<dyn ContainerWriter>>;
}

/// Read access to an opened container.
pub trait Container {
    /// Name the container was opened from.
    fn name(&self) -> &Path;

    fn layout(&self) -> Layout;

    /// Top-level entry names, in the container's listing order.
    fn keys(&self) -> Result<Vec<String>>;

    /// Extract the record identified by `id`.
    ///
    /// Returns [`MissingRecord`](crate::error::ErrorKind::MissingRecord) if no
    /// such record exists.
    fn record(&self, id: &str) -> Result<Record>;

    /// Extract the only record of a [`Layout::Single`] container.
    ///
    /// Returns [`Layout`](crate::error::ErrorKind::Layout) for multi-record
    /// containers.
    fn single(&self) -> Result<Record>;
}

/// Write access to a container. Changes are only guaranteed to be persisted
/// once [`finish`](Self::finish) returns successfully.
pub trait ContainerWriter {
    /// Store a record. Single-layout containers accept exactly one.
    fn add_record(&mut self, record: &Record) -> Result<()>;

    /// Whether a top-level section named `name` exists.
    fn has_section(&self, name: &str) -> bool;

    /// Create an empty top-level section. Creating one that already exists
    /// is a no-op.
    fn create_section(&mut self, name: &str) -> Result<()>;

    /// Flush and close the container.
    fn finish(self: Box<Self>) -> Result<()>;
}
