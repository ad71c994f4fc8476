//! Streaming archive retrieval.
//!
//! Turns a tar archive of containers into a lazy, single-pass sequence of
//! [`ArchiveEntry`] descriptors. Each matching entry's bytes are read into the
//! [`ContentCache`] under the entry name so that a reader which only knows how
//! to open names can find them, without anything being unpacked to disk.

use crate::cache::ContentCache;
use crate::encoding::Compression;
use crate::error::{ErrorKind, Result};
use crate::peek::PeekableReader;
use crate::progress::Progress;
use exn::ResultExt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::instrument;

const BLOCK_SIZE: usize = 512;
const CHECKSUM_FIELD: Range<usize> = 148..156;

/// Descriptor for one container pulled out of an archive. The bytes
/// themselves live in the [`ContentCache`] under [`name`](Self::name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Entry name inside the archive; also the cache key.
    pub name: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

/// An opened and validated tar archive, ready to be retrieved from.
pub struct TarArchive {
    path: PathBuf,
    compression: Compression,
    archive: tar::Archive<Box<dyn Read>>,
}

impl TarArchive {
    /// Open an archive for sequential reading.
    ///
    /// The compression layer is detected from magic bytes, falling back to
    /// the file suffix. The first header block is decompressed and validated
    /// immediately, so a missing file, a corrupt compression layer or a file
    /// that simply isn't a tar archive all fail here rather than on the first
    /// pull.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            let kind = ErrorKind::from_io(&err, path);
            exn::Exn::from(err).raise(kind)
        })?;
        let mut reader = BufReader::new(file);
        let head = reader.fill_buf().or_raise(|| ErrorKind::Io)?;
        let compression = match Compression::from_magic_bytes(head) {
            Compression::None => Compression::from_archive_path(path).unwrap_or_default(),
            detected => detected,
        };

        let mut peekable = PeekableReader::new(compression.wrap_reader(reader));
        let block = peekable.peek(BLOCK_SIZE).or_raise(|| ErrorKind::InvalidArchive(path.to_path_buf()))?;
        if !is_valid_header(block) {
            exn::bail!(ErrorKind::InvalidArchive(path.to_path_buf()));
        }
        tracing::debug!(%compression, "Opened archive");

        let reader: Box<dyn Read> = Box::new(peekable.into_reader());
        Ok(Self {
            path: path.to_path_buf(),
            compression,
            archive: tar::Archive::new(reader),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Start retrieving entries whose names end with `suffix`
    /// (ASCII case-insensitive).
    ///
    /// An archive can only be walked once; a second call fails. Open the
    /// archive again to reprocess it.
    pub fn retrieve(&mut self, cache: ContentCache, progress: Progress, suffix: &str) -> Result<ArchiveRetriever<'_>> {
        let path = self.path.clone();
        let entries = self.archive.entries().or_raise(|| ErrorKind::InvalidArchive(path))?;
        Ok(ArchiveRetriever {
            entries,
            cache,
            progress,
            suffix: suffix.to_ascii_lowercase(),
            retrieved: 0,
            finished: false,
        })
    }
}

/// Single-pass iterator over the containers inside a [`TarArchive`].
///
/// Every yielded entry has already been stored in the cache, and the
/// progress total has been raised to the number of entries seen so far (the
/// real total is unknowable until the archive is exhausted). A read error is
/// yielded once, after which the iterator is finished.
pub struct ArchiveRetriever<'a> {
    entries: tar::Entries<'a, Box<dyn Read>>,
    cache: ContentCache,
    progress: Progress,
    suffix: String,
    retrieved: u64,
    finished: bool,
}

impl ArchiveRetriever<'_> {
    /// Number of entries retrieved so far.
    pub fn retrieved(&self) -> u64 {
        self.retrieved
    }

    fn advance(&mut self) -> Result<Option<ArchiveEntry>> {
        for entry in self.entries.by_ref() {
            let mut entry = entry.or_raise(|| ErrorKind::Entry)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path().or_raise(|| ErrorKind::Entry)?.into_owned();
            if !has_suffix(&name, &self.suffix) {
                tracing::trace!(name = %name.display(), "Skipping archive entry");
                continue;
            }
            let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
            entry.read_to_end(&mut bytes).or_raise(|| ErrorKind::Entry)?;
            let size = bytes.len() as u64;
            self.cache.insert(name.clone(), bytes);
            self.retrieved += 1;
            self.progress.set_length(self.retrieved);
            return Ok(Some(ArchiveEntry { name, size }));
        }
        Ok(None)
    }
}

impl Iterator for ArchiveRetriever<'_> {
    type Item = Result<ArchiveEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.advance().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.finished = true;
        }
        next
    }
}

impl FusedIterator for ArchiveRetriever<'_> {}

fn has_suffix(name: &Path, suffix: &str) -> bool {
    name.to_str().is_some_and(|name| name.to_ascii_lowercase().ends_with(suffix))
}

/// A valid first block is either a header with a matching checksum, or the
/// all-zero end-of-archive marker (an empty archive).
fn is_valid_header(block: &[u8]) -> bool {
    if block.len() < BLOCK_SIZE {
        return false;
    }
    if block.iter().all(|&b| b == 0) {
        return true;
    }
    let Ok(stored) = tar::Header::from_byte_slice(block).cksum() else {
        return false;
    };
    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| if CHECKSUM_FIELD.contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum();
    stored == computed
}
