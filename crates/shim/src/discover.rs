use crate::error::{ErrorKind, Result};
use crate::expand::FileLister;
use exn::ResultExt;
use multiread_archive::{TarArchive, is_archive_path};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Converter input, in whichever form it was found.
pub enum Discovered {
    /// Container files from a directory scan (or a single file).
    Files(Vec<PathBuf>),
    /// A tar archive of containers, opened and validated but not yet read.
    Archive(TarArchive),
}

impl Discovered {
    /// An existing file with an archive suffix is opened as an archive;
    /// anything else goes to `lister`.
    #[instrument(skip(lister), fields(input = %input.display()))]
    pub fn from_input(input: &Path, lister: &impl FileLister, recursive: bool) -> Result<Self> {
        if input.is_file() && is_archive_path(input) {
            let archive = TarArchive::open(input).or_raise(|| ErrorKind::Archive(input.to_path_buf()))?;
            tracing::info!(compression = %archive.compression(), "Reading containers from archive");
            return Ok(Self::Archive(archive));
        }
        let files = lister.list(input, recursive)?;
        tracing::info!(files = files.len(), "Discovered input files");
        Ok(Self::Files(files))
    }

    /// Number of inputs, or `None` when it can't be known without reading
    /// the whole archive.
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Files(files) => Some(files.len()),
            Self::Archive(_) => None,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive(_))
    }
}

impl std::fmt::Debug for Discovered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Files(files) => f.debug_tuple("Files").field(files).finish(),
            Self::Archive(archive) => f.debug_tuple("Archive").field(&archive.path()).finish(),
        }
    }
}
