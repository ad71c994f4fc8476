//! JSON-backed container format for testing.
//!
//! Containers are stored as a short magic header followed by a JSON document.
//! It models just enough of the real thing (prefixed record entries, a
//! single-record layout, top-level sections) to exercise everything above the
//! [`ContainerFormat`] seam without linking a native container library.

use crate::error::{Error, ErrorKind, Result};
use crate::format::{Container, ContainerFormat, ContainerWriter, Layout, Source};
use crate::record::{Attributes, ChannelInfo, Record};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MAGIC: &[u8] = b"\x89MOCKF5\r\n";
/// Entry that holds the record of a single-layout container.
const SINGLE_ENTRY: &str = "Raw";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Document {
    layout: Layout,
    entries: Vec<Entry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    name: String,
    #[serde(flatten)]
    node: Node,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Node {
    Record(Record),
    Section,
}

/// In-memory/JSON container format for tests.
///
/// # Examples
///
/// ```
/// use multiread_container::mock::MemoryFormat;
/// use multiread_container::{ContainerFormat, Layout, Source};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let format = MemoryFormat::default();
/// let bytes = format.to_bytes(Layout::Multi, &[]).unwrap();
/// let container = format
///     .open(Source::Memory { name: Path::new("empty.fast5"), bytes: Arc::from(bytes) })
///     .unwrap();
/// assert!(container.keys().unwrap().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryFormat {
    version: String,
    record_prefix: String,
}

impl Default for MemoryFormat {
    fn default() -> Self {
        Self {
            version: "2.10.0".to_string(),
            record_prefix: "read_".to_string(),
        }
    }
}

impl MemoryFormat {
    /// Change the reported library version (for compatibility check tests).
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Serialize records into container bytes without touching disk. Archive
    /// fixtures are built from this output.
    pub fn to_bytes(&self, layout: Layout, records: &[Record]) -> Result<Vec<u8>> {
        let mut writer = MockWriter::new(PathBuf::from("<memory>"), layout, self.record_prefix.clone());
        for record in records {
            writer.add_record(record)?;
        }
        writer.encode()
    }

    /// Write records to a new container file at `path`.
    pub fn write(&self, path: impl AsRef<Path>, layout: Layout, records: &[Record]) -> Result<()> {
        let mut writer = self.create(path.as_ref(), layout)?;
        for record in records {
            writer.add_record(record)?;
        }
        writer.finish()
    }

    fn decode(&self, name: &Path, bytes: &[u8]) -> Result<Document> {
        let Some(json) = bytes.strip_prefix(MAGIC) else {
            exn::bail!(ErrorKind::Format(name.to_path_buf()));
        };
        serde_json::from_slice(json).or_raise(|| ErrorKind::Format(name.to_path_buf()))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| ErrorKind::io(e, path))
    }
}

impl ContainerFormat for MemoryFormat {
    fn name(&self) -> &str {
        "mock"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn open(&self, source: Source<'_>) -> Result<Box<dyn Container>> {
        let document = match &source {
            Source::Path(path) => self.decode(path, &self.read(path)?)?,
            Source::Memory { name, bytes } => self.decode(name, bytes)?,
        };
        Ok(Box::new(MockContainer {
            name: source.name().to_path_buf(),
            document,
            record_prefix: self.record_prefix.clone(),
        }))
    }

    fn create(&self, path: &Path, layout: Layout) -> Result<Box<dyn ContainerWriter>> {
        Ok(Box::new(MockWriter::new(path.to_path_buf(), layout, self.record_prefix.clone())))
    }
}

struct MockContainer {
    name: PathBuf,
    document: Document,
    record_prefix: String,
}

impl MockContainer {
    fn find(&self, entry: &str) -> Option<&Record> {
        self.document.entries.iter().find_map(|e| match &e.node {
            Node::Record(record) if e.name == entry => Some(record),
            _ => None,
        })
    }
}

impl Container for MockContainer {
    fn name(&self) -> &Path {
        &self.name
    }

    fn layout(&self) -> Layout {
        self.document.layout
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.document.entries.iter().map(|e| e.name.clone()).collect())
    }

    fn record(&self, id: &str) -> Result<Record> {
        let found = match self.document.layout {
            Layout::Multi => self.find(&format!("{}{id}", self.record_prefix)),
            Layout::Single => self.find(SINGLE_ENTRY).filter(|r| r.id == id),
        };
        found.cloned().ok_or_else(|| Error::from(ErrorKind::MissingRecord(id.to_string())))
    }

    fn single(&self) -> Result<Record> {
        if self.document.layout != Layout::Single {
            exn::bail!(ErrorKind::Layout("single"));
        }
        self.find(SINGLE_ENTRY)
            .cloned()
            .ok_or_else(|| Error::from(ErrorKind::MissingRecord(SINGLE_ENTRY.to_string())))
    }
}

struct MockWriter {
    path: PathBuf,
    document: Document,
    record_prefix: String,
}

impl MockWriter {
    fn new(path: PathBuf, layout: Layout, record_prefix: String) -> Self {
        Self {
            path,
            document: Document { layout, entries: Vec::new() },
            record_prefix,
        }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = MAGIC.to_vec();
        serde_json::to_writer(&mut bytes, &self.document).or_raise(|| ErrorKind::Write(self.path.clone()))?;
        Ok(bytes)
    }
}

impl ContainerWriter for MockWriter {
    fn add_record(&mut self, record: &Record) -> Result<()> {
        let name = match self.document.layout {
            Layout::Multi => format!("{}{}", self.record_prefix, record.id),
            Layout::Single => SINGLE_ENTRY.to_string(),
        };
        if self.document.entries.iter().any(|e| e.name == name) {
            // Either a second record in a single-layout container, or a
            // duplicate ID in a multi-layout one. Both break the invariant
            // that IDs are unique within their container.
            exn::bail!(ErrorKind::Write(self.path.clone()));
        }
        self.document.entries.push(Entry { name, node: Node::Record(record.clone()) });
        Ok(())
    }

    fn has_section(&self, name: &str) -> bool {
        self.document.entries.iter().any(|e| e.name == name && matches!(e.node, Node::Section))
    }

    fn create_section(&mut self, name: &str) -> Result<()> {
        if !self.has_section(name) {
            self.document.entries.push(Entry { name: name.to_string(), node: Node::Section });
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let bytes = self.encode()?;
        std::fs::write(&self.path, bytes).map_err(|e| ErrorKind::io(e, &self.path))?;
        tracing::debug!(path = %self.path.display(), layout = %self.document.layout, "Container written");
        Ok(())
    }
}

/// A small but complete record for fixtures: three samples, a full
/// tracking ID and one context tag.
pub fn sample_record(id: &str) -> Record {
    let tracking_id = [
        ("run_id", "run"),
        ("flow_cell_id", "FAK00001"),
        ("device_id", "MN00001"),
        ("hostname", "sequencer"),
        ("exp_start_time", "2019-05-01T12:00:00Z"),
        ("sample_id", "sample"),
    ];
    Record {
        id: id.to_string(),
        read_number: 1,
        start_time: 8000,
        duration: 3,
        start_mux: Some(2),
        median_before: Some(210.5),
        signal: vec![1, 2, 3],
        channel: ChannelInfo {
            channel_number: "7".to_string(),
            sampling_rate: 4000.0,
            digitisation: 8192.0,
            offset: 0.0,
            range: 1400.0,
        },
        tracking_id: tracking_id.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        context_tags: Attributes::from([("sequencing_kit".to_string(), "sqk-lsk109".to_string())]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_write_and_open_multi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.fast5");
        let format = MemoryFormat::default();
        format.write(&path, Layout::Multi, &[sample_record("r1"), sample_record("r2")]).unwrap();

        let container = format.open(Source::Path(&path)).unwrap();
        assert_eq!(container.layout(), Layout::Multi);
        assert_eq!(container.keys().unwrap(), vec!["read_r1", "read_r2"]);
        assert_eq!(container.record("r2").unwrap(), sample_record("r2"));
        assert!(matches!(&*container.single().unwrap_err(), ErrorKind::Layout(_)));
    }

    #[test]
    fn test_single_layout() {
        let format = MemoryFormat::default();
        let bytes = format.to_bytes(Layout::Single, &[sample_record("only")]).unwrap();
        let container = format.open(Source::Memory { name: Path::new("one.fast5"), bytes: Arc::from(bytes) }).unwrap();
        assert_eq!(container.keys().unwrap(), vec!["Raw"]);
        assert_eq!(container.single().unwrap().id, "only");
        assert_eq!(container.record("only").unwrap().id, "only");
        assert!(matches!(&*container.record("other").unwrap_err(), ErrorKind::MissingRecord(_)));
    }

    #[test]
    fn test_single_layout_rejects_second_record() {
        let format = MemoryFormat::default();
        assert!(format.to_bytes(Layout::Single, &[sample_record("a"), sample_record("b")]).is_err());
    }

    #[test]
    fn test_not_a_container() {
        let format = MemoryFormat::default();
        let source = Source::Memory { name: Path::new("junk.fast5"), bytes: Arc::from(&b"definitely not"[..]) };
        let err = format.open(source).err().unwrap();
        assert!(err.is_format_mismatch());
    }

    #[test]
    fn test_corrupt_json() {
        let format = MemoryFormat::default();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(b"{\"layout\":");
        let source = Source::Memory { name: Path::new("cut.fast5"), bytes: Arc::from(bytes) };
        assert!(matches!(&*format.open(source).err().unwrap(), ErrorKind::Format(_)));
    }

    #[test]
    fn test_missing_file() {
        let format = MemoryFormat::default();
        let err = format.open(Source::Path(Path::new("/definitely/not/here.fast5"))).err().unwrap();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.fast5");
        let format = MemoryFormat::default();

        let mut writer = format.create(&path, Layout::Single).unwrap();
        writer.add_record(&sample_record("r1")).unwrap();
        assert!(!writer.has_section("Analyses"));
        writer.create_section("Analyses").unwrap();
        writer.create_section("Analyses").unwrap();
        assert!(writer.has_section("Analyses"));
        writer.finish().unwrap();

        let container = format.open(Source::Path(&path)).unwrap();
        assert_eq!(container.keys().unwrap(), vec!["Raw", "Analyses"]);
    }
}
