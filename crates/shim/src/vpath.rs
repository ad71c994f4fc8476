//! Virtual paths.
//!
//! A virtual path names one record inside a multi-record container using a
//! single path-like token: `{container stem}{separator}{record id}{suffix}`.
//! With the default convention, record `abc` of `reads/batch_0.fast5` becomes
//! `reads/batch_0___read_abc.fast5`.
//!
//! Encoding is purely syntactic. [`Convention::locate`] is the one place the
//! filesystem is consulted: a virtual-looking name that exists as a regular
//! file is that file, not a record.

use multiread_config::ContainerSettings;
use std::path::{Path, PathBuf};

/// Naming convention shared by the encoder, decoder and expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convention {
    suffix: String,
    separator: String,
    record_prefix: String,
    analyses_section: String,
}

impl Default for Convention {
    fn default() -> Self {
        Self::from(&ContainerSettings::default())
    }
}

impl From<&ContainerSettings> for Convention {
    fn from(settings: &ContainerSettings) -> Self {
        Self {
            suffix: settings.suffix.clone(),
            separator: settings.separator.clone(),
            record_prefix: settings.record_prefix.clone(),
            analyses_section: settings.analyses_section.clone(),
        }
    }
}

/// Result of [`Convention::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub container: PathBuf,
    /// `None` when the input was not a well-formed virtual path; `container`
    /// is then the input unchanged.
    pub record: Option<String>,
}

/// Where the bytes for a path actually live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// An ordinary file (or cached entry) to be opened as-is.
    Plain(PathBuf),
    /// One record inside a container.
    Record { container: PathBuf, id: String },
}

impl Convention {
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn record_prefix(&self) -> &str {
        &self.record_prefix
    }

    pub fn analyses_section(&self) -> &str {
        &self.analyses_section
    }

    /// Build the virtual path for record `record_id` of `container`.
    ///
    /// The container's own suffix text is kept (`A.FAST5` stays upper case).
    /// A container without the suffix gets the canonical one appended.
    ///
    /// The result only decodes back to `(container, record_id)` when
    /// [`can_encode`](Self::can_encode) holds. Ids that are empty or contain
    /// the separator or a path separator, and containers that lack the
    /// suffix or have an empty file stem, don't round-trip.
    ///
    /// ```
    /// use multiread_shim::Convention;
    ///
    /// let convention = Convention::default();
    /// assert_eq!(convention.encode("runs/x.fast5", "r1"), "runs/x___read_r1.fast5");
    /// ```
    pub fn encode(&self, container: &str, record_id: &str) -> String {
        let separator = &self.separator;
        match self.split_suffix(container) {
            Some((stem, suffix)) => format!("{stem}{separator}{record_id}{suffix}"),
            None => format!("{container}{separator}{record_id}{}", self.suffix),
        }
    }

    /// Whether the virtual path for `record_id` of `container` decodes back
    /// to exactly that pair.
    pub fn can_encode(&self, container: &str, record_id: &str) -> bool {
        let decoded = self.decode(Path::new(&self.encode(container, record_id)));
        decoded.record.as_deref() == Some(record_id) && decoded.container == Path::new(container)
    }

    /// Split a virtual path back into container and record id.
    ///
    /// Anything that isn't a well-formed virtual path comes back unchanged
    /// with no record; this never fails.
    pub fn decode(&self, path: &Path) -> Decoded {
        let plain = || Decoded { container: path.to_path_buf(), record: None };
        let Some((body, suffix)) = path.to_str().and_then(|s| self.split_suffix(s)) else {
            return plain();
        };
        let Some((stem, id)) = body.rsplit_once(self.separator.as_str()) else {
            return plain();
        };
        if stem.is_empty() || stem.ends_with(['/', '\\']) || id.is_empty() || id.contains(['/', '\\']) {
            return plain();
        }
        Decoded {
            container: PathBuf::from(format!("{stem}{suffix}")),
            record: Some(id.to_string()),
        }
    }

    /// Syntactic check only: ends with the suffix and contains the separator.
    pub fn is_virtual(&self, path: &Path) -> bool {
        path.to_str()
            .and_then(|s| self.split_suffix(s))
            .is_some_and(|(body, _)| body.contains(self.separator.as_str()))
    }

    /// Resolve a path to where its bytes live. A regular file on disk always
    /// wins over a virtual interpretation of its name.
    pub fn locate(&self, path: &Path) -> Location {
        match self.decode(path) {
            Decoded { container, record: Some(id) } if !path.is_file() => Location::Record { container, id },
            _ => Location::Plain(path.to_path_buf()),
        }
    }

    /// Split off the suffix (ASCII case-insensitive), returning the body and
    /// the suffix text as written.
    fn split_suffix<'a>(&self, path: &'a str) -> Option<(&'a str, &'a str)> {
        let at = path.len().checked_sub(self.suffix.len())?;
        let (body, suffix) = (path.get(..at)?, path.get(at..)?);
        suffix.eq_ignore_ascii_case(&self.suffix).then_some((body, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("x.fast5", "r1")]
    #[case("dir/sub/x.fast5", "0a1b-2c3d")]
    #[case("X.FAST5", "r1")]
    #[case("a___read_b.fast5", "c")]
    #[case("./x.fast5", "r")]
    fn test_round_trip(#[case] container: &str, #[case] record: &str) {
        let convention = Convention::default();
        let encoded = convention.encode(container, record);
        assert!(convention.is_virtual(Path::new(&encoded)));
        let decoded = convention.decode(Path::new(&encoded));
        assert_eq!(decoded.container, PathBuf::from(container));
        assert_eq!(decoded.record.as_deref(), Some(record));
    }

    #[rstest]
    #[case::plain("x.fast5", "r1", true)]
    #[case::nested_separator("a___read_b.fast5", "c", true)]
    #[case::id_with_separator("x.fast5", "a___read_b", false)]
    #[case::id_with_slash("x.fast5", "a/b", false)]
    #[case::id_with_backslash("x.fast5", "a\\b", false)]
    #[case::empty_id("x.fast5", "", false)]
    #[case::suffix_only_container("dir/.fast5", "r1", false)]
    #[case::container_without_suffix("x.h5", "r1", false)]
    fn test_can_encode(#[case] container: &str, #[case] record: &str, #[case] expected: bool) {
        assert_eq!(Convention::default().can_encode(container, record), expected);
    }

    #[test]
    fn test_encode_keeps_suffix_case() {
        let convention = Convention::default();
        assert_eq!(convention.encode("X.Fast5", "r"), "X___read_r.Fast5");
        assert_eq!(convention.encode("noext", "r"), "noext___read_r.fast5");
    }

    #[rstest]
    #[case::no_suffix("x___read_r1.txt")]
    #[case::no_separator("x.fast5")]
    #[case::empty_stem("___read_r1.fast5")]
    #[case::empty_stem_in_dir("dir/___read_r1.fast5")]
    #[case::empty_id("x___read_.fast5")]
    #[case::id_with_slash("x___read_a/b.fast5")]
    #[case::only_suffix(".fast5")]
    #[case::empty("")]
    fn test_decode_malformed_is_plain(#[case] path: &str) {
        let decoded = Convention::default().decode(Path::new(path));
        assert_eq!(decoded, Decoded { container: PathBuf::from(path), record: None });
    }

    #[test]
    fn test_decode_splits_on_last_separator() {
        let decoded = Convention::default().decode(Path::new("a___read_b___read_c.fast5"));
        assert_eq!(decoded.container, PathBuf::from("a___read_b.fast5"));
        assert_eq!(decoded.record.as_deref(), Some("c"));
    }

    #[rstest]
    #[case("x___read_r.fast5", true)]
    #[case("X___READ_R.FAST5", false)]
    #[case("x.fast5", false)]
    #[case("x___read_r.fast5.bak", false)]
    fn test_is_virtual(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(Convention::default().is_virtual(Path::new(path)), expected);
    }

    #[test]
    fn test_custom_convention() {
        let settings = ContainerSettings {
            suffix: ".f5".to_string(),
            separator: "#".to_string(),
            ..ContainerSettings::default()
        };
        let convention = Convention::from(&settings);
        assert_eq!(convention.encode("x.f5", "r"), "x#r.f5");
        assert_eq!(convention.decode(Path::new("x#r.f5")).record.as_deref(), Some("r"));
    }

    #[test]
    fn test_locate_prefers_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let convention = Convention::default();
        let virtual_path = dir.path().join("x___read_r1.fast5");
        assert_eq!(
            convention.locate(&virtual_path),
            Location::Record { container: dir.path().join("x.fast5"), id: "r1".to_string() }
        );

        std::fs::write(&virtual_path, b"split out earlier").unwrap();
        assert_eq!(convention.locate(&virtual_path), Location::Plain(virtual_path.clone()));
    }

    #[test]
    fn test_locate_plain() {
        let convention = Convention::default();
        let path = Path::new("reads/x.fast5");
        assert_eq!(convention.locate(path), Location::Plain(path.to_path_buf()));
    }
}
