use crate::error::{ErrorKind, Result};
use crate::vpath::{Convention, Location};
use exn::ResultExt;
use multiread_archive::ContentCache;
use multiread_container::error::Result as ContainerResult;
use multiread_container::{Container, FormatHandle, Record, Source};
use std::path::Path;
use std::sync::Arc;

/// Opens containers by name, preferring bytes held in the content cache over
/// the filesystem.
#[derive(Clone)]
pub struct Opener {
    format: FormatHandle,
    cache: ContentCache,
}

impl Opener {
    pub fn new(format: FormatHandle, cache: ContentCache) -> Self {
        Self { format, cache }
    }

    pub fn format(&self) -> &FormatHandle {
        &self.format
    }

    /// Open `path` read-only. Errors keep the container crate's kinds so that
    /// callers can tell a format mismatch from an I/O failure.
    pub fn open(&self, path: &Path) -> ContainerResult<Box<dyn Container>> {
        match self.cache.get(path) {
            Some(bytes) => {
                tracing::trace!(path = %path.display(), "Opening container from cache");
                self.format.open(Source::Memory { name: path, bytes })
            },
            None => self.format.open(Source::Path(path)),
        }
    }

    /// Bytes held in the content cache under `path`, if any.
    pub fn cached(&self, path: &Path) -> Option<Arc<[u8]>> {
        self.cache.get(path)
    }

    /// Like [`Convention::locate`], except that cached names are always
    /// plain, even when they look virtual.
    pub fn locate(&self, path: &Path, convention: &Convention) -> Location {
        if self.cache.contains(path) {
            return Location::Plain(path.to_path_buf());
        }
        convention.locate(path)
    }

    /// Read the record a (possibly virtual) path refers to. A plain path
    /// must be a single-record container.
    pub fn read_record(&self, path: &Path, convention: &Convention) -> Result<Record> {
        self.read_location(&self.locate(path, convention))
    }

    pub fn read_location(&self, location: &Location) -> Result<Record> {
        let record = match location {
            Location::Plain(path) => self.open(path).and_then(|container| container.single()),
            Location::Record { container, id } => self.open(container).and_then(|container| container.record(id)),
        };
        record.or_raise(|| ErrorKind::Container)
    }
}

impl std::fmt::Debug for Opener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opener").field("format", &self.format.name()).field("cache", &self.cache).finish()
    }
}
