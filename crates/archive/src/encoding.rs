//! Archive compression detection.
//!
//! Tar archives arrive either bare or wrapped in a compression layer. The
//! layer is detected from magic bytes where possible, falling back to the
//! file suffix.

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::Read;
use std::path::Path;

const BZIP2_MAGIC: [u8; 3] = [0x42, 0x5A, 0x68];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// File suffixes recognised as tar archives, with the compression layer
/// each one implies.
pub const ARCHIVE_SUFFIXES: [(&str, Compression); 5] = [
    (".tar", Compression::None),
    (".tar.gz", Compression::Gzip),
    (".tgz", Compression::Gzip),
    (".tar.bz2", Compression::Bzip2),
    (".tbz2", Compression::Bzip2),
];

/// Compression layer wrapped around a tar archive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.tar.bz2, .tbz2)
    Bzip2,
    /// Gzip compression (.tar.gz, .tgz)
    Gzip,
}

impl Compression {
    /// Detect the compression layer from an archive's file name.
    ///
    /// Returns [`Option::None`] when the name does not carry one of the
    /// [`ARCHIVE_SUFFIXES`] (ASCII case-insensitive).
    #[must_use]
    pub fn from_archive_path(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        ARCHIVE_SUFFIXES
            .iter()
            // A bare suffix (".tar") is a dotfile, not an archive.
            .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
            .map(|(_, compression)| *compression)
    }

    /// Detect compression format from magic bytes.
    ///
    /// Returns the `None` variant if no magic bytes match or if the input
    /// is too short to detect any format.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BZIP2_MAGIC) {
            return Compression::Bzip2;
        }
        if bytes.starts_with(&GZIP_MAGIC) {
            return Compression::Gzip;
        }
        Compression::None
    }

    /// Wrap a reader with the matching decompression layer.
    ///
    /// Multi-member decoders are used so that concatenated streams (as
    /// produced by parallel compressors) are read in full.
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
            Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
        }
    }

    /// Returns the short name (for displaying to user).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Whether `path` names a tar archive by suffix alone.
#[must_use]
pub fn is_archive_path(path: impl AsRef<Path>) -> bool {
    Compression::from_archive_path(path).is_some()
}
