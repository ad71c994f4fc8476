//! Container-aware file copying.
//!
//! The host copies input files around (e.g. into a working directory) with a
//! plain byte copy. A virtual path has no bytes of its own, so
//! [`ContainerCopier`] materialises the record it names as a new
//! single-record container instead.

use crate::error::{ErrorKind, Result};
use crate::open::Opener;
use crate::vpath::{Convention, Location};
use exn::ResultExt;
use multiread_container::Layout;
use multiread_container::error::{ErrorKind as ContainerErrorKind, Result as ContainerResult};
use std::path::Path;
use tracing::instrument;

/// Copies `src` to `dst`, returning the number of bytes written.
pub trait FileCopier {
    fn copy(&self, src: &Path, dst: &Path) -> Result<u64>;
}

/// Byte-for-byte copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCopier;

impl FileCopier for PlainCopier {
    fn copy(&self, src: &Path, dst: &Path) -> Result<u64> {
        std::fs::copy(src, dst).or_raise(|| ErrorKind::Copy { from: src.to_path_buf(), to: dst.to_path_buf() })
    }
}

/// Copies plain files through `C` (or out of the content cache), and extracts
/// virtual paths into single-record containers.
#[derive(Debug, Clone)]
pub struct ContainerCopier<C = PlainCopier> {
    plain: C,
    opener: Opener,
    convention: Convention,
}

impl ContainerCopier {
    pub fn new(opener: Opener, convention: Convention) -> Self {
        Self::with_plain(PlainCopier, opener, convention)
    }
}

impl<C: FileCopier> ContainerCopier<C> {
    pub fn with_plain(plain: C, opener: Opener, convention: Convention) -> Self {
        Self { plain, opener, convention }
    }

    fn extract(&self, container: &Path, id: &str, dst: &Path) -> ContainerResult<u64> {
        let record = self.opener.open(container)?.record(id)?;
        let mut writer = self.opener.format().create(dst, Layout::Single)?;
        writer.add_record(&record)?;
        let section = self.convention.analyses_section();
        if !writer.has_section(section) {
            writer.create_section(section)?;
        }
        writer.finish()?;
        let metadata = std::fs::metadata(dst).map_err(|e| ContainerErrorKind::io(e, dst))?;
        Ok(metadata.len())
    }
}

impl<C: FileCopier> FileCopier for ContainerCopier<C> {
    #[instrument(skip(self), fields(src = %src.display(), dst = %dst.display()))]
    fn copy(&self, src: &Path, dst: &Path) -> Result<u64> {
        let copied = match self.opener.locate(src, &self.convention) {
            Location::Plain(_) => match self.opener.cached(src) {
                Some(bytes) => std::fs::write(dst, &*bytes)
                    .map(|()| bytes.len() as u64)
                    .or_raise(|| ErrorKind::Copy { from: src.to_path_buf(), to: dst.to_path_buf() }),
                None => self.plain.copy(src, dst),
            },
            Location::Record { container, id } => {
                tracing::debug!(container = %container.display(), record = %id, "Extracting record");
                self.extract(&container, &id, dst)
                    .or_raise(|| ErrorKind::Copy { from: src.to_path_buf(), to: dst.to_path_buf() })
            },
        };
        if let Err(err) = &copied {
            tracing::error!(error = ?err, "Copy failed");
        }
        copied
    }
}
