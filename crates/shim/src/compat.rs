//! Container library compatibility check.

use crate::error::{ErrorKind, Result};
use multiread_container::ContainerFormat;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A permissive version number: dot-separated components, each split further
/// into numeric and non-numeric runs (`2.10.0rc1` is `[2, 10, 0, "rc", 1]`).
/// Numeric runs compare as numbers, everything else as text, and a version
/// that extends another compares greater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseVersion {
    raw: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Part {
    Number(u64),
    Text(String),
}

impl LooseVersion {
    pub fn parse(raw: &str) -> Self {
        let mut parts = Vec::new();
        for component in raw.trim().split('.') {
            let mut rest = component;
            while let Some(first) = rest.chars().next() {
                let numeric = first.is_ascii_digit();
                let end = rest.find(|c: char| c.is_ascii_digit() != numeric).unwrap_or(rest.len());
                let (run, tail) = rest.split_at(end);
                parts.push(match run.parse() {
                    Ok(number) if numeric => Part::Number(number),
                    _ => Part::Text(run.to_string()),
                });
                rest = tail;
            }
        }
        Self { raw: raw.trim().to_string(), parts }
    }
}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl Display for LooseVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.raw)
    }
}

/// Refuse to run against a container library older than `minimum`.
///
/// Older libraries can't open multi-record containers at all, so this runs
/// before any other work.
pub fn check_compatibility(format: &dyn ContainerFormat, minimum: &str) -> Result<()> {
    let found = LooseVersion::parse(format.version());
    let required = LooseVersion::parse(minimum);
    if found < required {
        tracing::error!(
            format = format.name(),
            found = %found,
            required = %required,
            "Container library is too old; upgrade it to read multi-record containers"
        );
        exn::bail!(ErrorKind::Incompatible { found: found.to_string(), required: required.to_string() });
    }
    tracing::debug!(format = format.name(), version = %found, "Container library is compatible");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiread_container::mock::MemoryFormat;
    use rstest::rstest;

    #[rstest]
    #[case("2.9.0", "2.9.0", Ordering::Equal)]
    #[case("2.10.0", "2.9.0", Ordering::Greater)]
    #[case("2.8.0", "2.9.0", Ordering::Less)]
    #[case("3", "2.9.0", Ordering::Greater)]
    #[case("2.9", "2.9.0", Ordering::Less)]
    #[case("2.9.0rc1", "2.9.0", Ordering::Greater)]
    #[case("2.9.0a", "2.9.0b", Ordering::Less)]
    #[case(" 2.9.0 ", "2.9.0", Ordering::Equal)]
    fn test_loose_ordering(#[case] left: &str, #[case] right: &str, #[case] expected: Ordering) {
        assert_eq!(LooseVersion::parse(left).cmp(&LooseVersion::parse(right)), expected);
    }

    #[test]
    fn test_compatible() {
        let format = MemoryFormat::default().with_version("2.10.0");
        assert!(check_compatibility(&format, "2.9.0").is_ok());
    }

    #[test]
    fn test_incompatible() {
        let format = MemoryFormat::default().with_version("2.8.1");
        let err = check_compatibility(&format, "2.9.0").unwrap_err();
        assert_eq!(*err, ErrorKind::Incompatible { found: "2.8.1".to_string(), required: "2.9.0".to_string() });
    }
}
