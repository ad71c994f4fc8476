//! Single-to-multi conversion.
//!
//! Gathers records from a directory of containers or from a tar archive of
//! them, and writes them out in batches as multi-record containers.

use crate::discover::Discovered;
use crate::error::{ErrorKind, Result};
use crate::expand::members;
use crate::open::Opener;
use crate::session::Session;
use crate::vpath::Convention;
use exn::ResultExt;
use multiread_archive::{ArchiveRetriever, Progress, TarArchive};
use multiread_container::{Layout, Record};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Written to the output directory: one `source<TAB>output` line per record.
pub const MAPPING_FILE: &str = "filename_mapping.txt";

/// A record (or the failure to read it), tagged with where it came from.
type Item = (PathBuf, Result<Record>);

/// What a conversion run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Output containers written.
    pub batches: usize,
    /// Records written across all batches.
    pub records: usize,
    /// Records that couldn't be read or written and were skipped.
    pub failed: usize,
    /// Path of the mapping file.
    pub mapping: PathBuf,
}

#[derive(Default)]
struct Tally {
    batches: usize,
    records: usize,
    failed: usize,
    mapping: Vec<(PathBuf, PathBuf)>,
}

pub struct Converter<'a> {
    session: &'a Session,
    output_dir: PathBuf,
}

impl<'a> Converter<'a> {
    pub fn new(session: &'a Session, output_dir: impl Into<PathBuf>) -> Self {
        Self { session, output_dir: output_dir.into() }
    }

    /// Convert everything found at `input` (a directory, a container or an
    /// archive). Unreadable records are logged and counted; anything that
    /// stops the run as a whole is an error.
    #[instrument(skip(self), fields(input = %input.display(), output = %self.output_dir.display()))]
    pub fn run(&self, input: &Path) -> Result<Summary> {
        fs::create_dir_all(&self.output_dir).or_raise(|| ErrorKind::Output(self.output_dir.clone()))?;
        let discovered = self.session.discover(input)?;
        let _bar = self.session.progress_bar(discovered.len().map(|n| n as u64));

        let mut tally = Tally::default();
        let outcome = match discovered {
            Discovered::Files(files) => self.convert_files(&files, &mut tally),
            Discovered::Archive(mut archive) => self.convert_archive(&mut archive, &mut tally),
        };
        self.session.progress().finish();
        outcome?;

        let mapping = self.write_mapping(&tally.mapping)?;
        tracing::info!(batches = tally.batches, records = tally.records, failed = tally.failed, "Conversion finished");
        Ok(Summary {
            batches: tally.batches,
            records: tally.records,
            failed: tally.failed,
            mapping,
        })
    }

    fn convert_files(&self, files: &[PathBuf], tally: &mut Tally) -> Result<()> {
        let opener = self.session.opener();
        let convention = self.session.convention();
        let progress = self.session.progress();

        // Records are read from where they live rather than by decoding their
        // virtual paths, which not every record id survives.
        let members = members(&opener, convention, files)?;
        progress.set_length(members.len() as u64);
        for batch in self.session.batcher().slices(&members) {
            let items = batch.iter().map(|member| (member.path.clone(), opener.read_location(&member.location)));
            self.write_batch(items, tally)?;
            progress.inc(batch.len() as u64);
        }
        Ok(())
    }

    fn convert_archive(&self, archive: &mut TarArchive, tally: &mut Tally) -> Result<()> {
        let path = archive.path().to_path_buf();
        let convention = self.session.convention();
        let progress = self.session.progress().clone();
        let entries = archive
            .retrieve(self.session.cache().clone(), progress.clone(), convention.suffix())
            .or_raise(|| ErrorKind::Archive(path.clone()))?;

        let mut records = ArchiveRecords {
            entries,
            opener: self.session.opener(),
            convention: convention.clone(),
            progress,
            pending: VecDeque::new(),
            failure: None,
        };
        for batch in self.session.batcher().stream(records.by_ref()) {
            self.write_batch(batch, tally)?;
        }
        match records.failure.take() {
            Some(err) => Err(err.raise(ErrorKind::Archive(path))),
            None => Ok(()),
        }
    }

    fn write_batch(&self, items: impl IntoIterator<Item = Item>, tally: &mut Tally) -> Result<()> {
        let settings = self.session.settings();
        let name = format!("{}_{}{}", settings.filename_base, tally.batches, self.session.convention().suffix());
        let output = self.output_dir.join(name);
        let mut writer =
            self.session.format().create(&output, Layout::Multi).or_raise(|| ErrorKind::Output(output.clone()))?;

        let mut written = 0;
        for (source, record) in items {
            let added = record.and_then(|record| writer.add_record(&record).or_raise(|| ErrorKind::Container));
            match added {
                Ok(()) => {
                    written += 1;
                    tally.mapping.push((source, output.clone()));
                },
                Err(err) => {
                    tracing::error!(source = %source.display(), error = ?err, "Skipping record that failed to convert");
                    tally.failed += 1;
                },
            }
        }
        writer.finish().or_raise(|| ErrorKind::Output(output.clone()))?;
        tally.batches += 1;
        tally.records += written;
        tracing::info!(path = %output.display(), records = written, "Wrote batch");
        Ok(())
    }

    fn write_mapping(&self, mapping: &[(PathBuf, PathBuf)]) -> Result<PathBuf> {
        let path = self.output_dir.join(MAPPING_FILE);
        let mut contents = String::new();
        for (source, output) in mapping {
            _ = writeln!(contents, "{}\t{}", source.display(), output.display());
        }
        fs::write(&path, contents).or_raise(|| ErrorKind::Output(path.clone()))?;
        Ok(path)
    }
}

/// Flattens archive entries into records.
///
/// Each entry is opened from the cache and fully read as soon as it's pulled,
/// before the batcher gets a chance to clear the cache. A retrieval error
/// ends iteration and is kept in `failure` for the caller.
struct ArchiveRecords<'a> {
    entries: ArchiveRetriever<'a>,
    opener: Opener,
    convention: Convention,
    progress: Progress,
    pending: VecDeque<Item>,
    failure: Option<multiread_archive::error::Error>,
}

impl ArchiveRecords<'_> {
    fn extract(&mut self, name: &Path) {
        let container = match self.opener.open(name) {
            Ok(container) => container,
            Err(err) => {
                self.pending.push_back((name.to_path_buf(), Err(err).or_raise(|| ErrorKind::Container)));
                return;
            },
        };
        if container.layout() == Layout::Single {
            self.pending.push_back((name.to_path_buf(), container.single().or_raise(|| ErrorKind::Container)));
            return;
        }
        let keys = match container.keys() {
            Ok(keys) => keys,
            Err(err) => {
                self.pending.push_back((name.to_path_buf(), Err(err).or_raise(|| ErrorKind::Container)));
                return;
            },
        };
        let (convention, pending) = (&self.convention, &mut self.pending);
        let raw = name.to_string_lossy();
        let before = pending.len();
        for id in keys.iter().filter_map(|key| key.strip_prefix(convention.record_prefix())) {
            let source = PathBuf::from(convention.encode(&raw, id));
            pending.push_back((source, container.record(id).or_raise(|| ErrorKind::Container)));
        }
        if pending.len() == before {
            tracing::warn!(entry = %name.display(), "Archive entry holds no records");
        }
    }
}

impl Iterator for ArchiveRecords<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(item);
            }
            match self.entries.next()? {
                Ok(entry) => {
                    self.extract(&entry.name);
                    self.progress.inc(1);
                },
                Err(err) => {
                    self.failure = Some(err);
                    return None;
                },
            }
        }
    }
}
