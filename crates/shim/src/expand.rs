//! Virtual file expansion.
//!
//! Turns a list of container paths into one virtual path per record, so that
//! a host which assumes "one file = one read" sees every read of a
//! multi-record container as a file of its own.

use crate::error::{ErrorKind, Result};
use crate::open::Opener;
use crate::vpath::{Convention, Location};
use exn::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Expand each path into the virtual paths of the records it holds.
///
/// Order is preserved: paths in input order, records in container listing
/// order. Anything that isn't a multi-record container (wrong format, a
/// single-record file, a non-UTF-8 path) passes through unchanged. Records
/// whose virtual path wouldn't decode back to them are skipped with a
/// warning. I/O failures while opening are errors.
///
/// ```no_run
/// # use multiread_shim::{Convention, Opener, expand};
/// # fn demo(opener: &Opener) -> multiread_shim::error::Result<()> {
/// let paths = expand(opener, &Convention::default(), ["runs/batch_0.fast5"])?;
/// // ["runs/batch_0___read_<id>.fast5", ...]
/// # Ok(())
/// # }
/// ```
pub fn expand<P: AsRef<Path>>(
    opener: &Opener,
    convention: &Convention,
    paths: impl IntoIterator<Item = P>,
) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for member in members(opener, convention, paths)? {
        match &member.location {
            Location::Record { container, id } if !member.encodable => {
                tracing::warn!(path = %container.display(), record = %id, "Skipping record id that can't be encoded");
            },
            _ => expanded.push(member.path),
        }
    }
    Ok(expanded)
}

/// One input after expansion, with where its record actually lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Member {
    /// Virtual path of a record, or the input path itself.
    pub path: PathBuf,
    pub location: Location,
    /// Whether `path` decodes back to `location`.
    pub encodable: bool,
}

/// Like [`expand`], but keeps records whose ids can't be encoded, located
/// directly in their container.
pub(crate) fn members<P: AsRef<Path>>(
    opener: &Opener,
    convention: &Convention,
    paths: impl IntoIterator<Item = P>,
) -> Result<Vec<Member>> {
    let mut members = Vec::new();
    for path in paths {
        expand_path(opener, convention, path.as_ref(), &mut members)?;
    }
    Ok(members)
}

fn expand_path(opener: &Opener, convention: &Convention, path: &Path, out: &mut Vec<Member>) -> Result<()> {
    let plain = Member {
        path: path.to_path_buf(),
        location: Location::Plain(path.to_path_buf()),
        encodable: true,
    };
    let Some(raw) = path.to_str() else {
        tracing::debug!(path = %path.display(), "Path is not valid UTF-8; passing through");
        out.push(plain);
        return Ok(());
    };
    let keys = match opener.open(path).and_then(|container| container.keys()) {
        Ok(keys) => keys,
        Err(err) if err.is_format_mismatch() => {
            tracing::debug!(path = %path.display(), reason = %err, "Not a multi-record container; passing through");
            out.push(plain);
            return Ok(());
        },
        Err(err) => return Err(err).or_raise(|| ErrorKind::Expand(path.to_path_buf())),
    };

    let before = out.len();
    for id in keys.iter().filter_map(|key| key.strip_prefix(convention.record_prefix())) {
        out.push(Member {
            path: PathBuf::from(convention.encode(raw, id)),
            location: Location::Record { container: path.to_path_buf(), id: id.to_string() },
            encodable: convention.can_encode(raw, id),
        });
    }
    if out.len() == before {
        // No prefixed entries: a single-record container.
        out.push(plain);
    } else {
        tracing::trace!(path = %path.display(), records = out.len() - before, "Expanded container");
    }
    Ok(())
}

/// Something that can list the input files under a root.
pub trait FileLister {
    fn list(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>>;
}

/// Lists files carrying the container suffix (ASCII case-insensitive),
/// sorted by path. A root that is itself a file is returned as-is.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    suffix: String,
}

impl DirectoryLister {
    pub fn new(suffix: &str) -> Self {
        Self { suffix: suffix.to_ascii_lowercase() }
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.len() > self.suffix.len() && name.to_ascii_lowercase().ends_with(&self.suffix))
    }
}

impl FileLister for DirectoryLister {
    #[instrument(skip(self), fields(root = %root.display()))]
    fn list(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                // Removed between listing its parent and descending into it.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound && dir != root => continue,
                Err(err) => return Err(err).or_raise(|| ErrorKind::Scan(dir)),
            };
            for entry in entries {
                let entry = entry.or_raise(|| ErrorKind::Scan(dir.clone()))?;
                let path = entry.path();
                let file_type = entry.file_type().or_raise(|| ErrorKind::Scan(path.clone()))?;
                if file_type.is_dir() {
                    if recursive {
                        stack.push(path);
                    }
                } else if self.matches(&path) && path.is_file() {
                    files.push(path);
                }
            }
        }
        files.sort();
        tracing::debug!(files = files.len(), "Listed input files");
        Ok(files)
    }
}

/// Wraps another lister, expanding every multi-record container it lists
/// into virtual paths.
#[derive(Debug, Clone)]
pub struct ExpandingLister<L> {
    inner: L,
    opener: Opener,
    convention: Convention,
}

impl<L> ExpandingLister<L> {
    pub fn new(inner: L, opener: Opener, convention: Convention) -> Self {
        Self { inner, opener, convention }
    }
}

impl<L: FileLister> FileLister for ExpandingLister<L> {
    fn list(&self, root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        let files = self.inner.list(root, recursive)?;
        expand(&self.opener, &self.convention, files)
    }
}
