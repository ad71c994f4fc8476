use crate::compat::check_compatibility;
use crate::copy::ContainerCopier;
use crate::discover::Discovered;
use crate::error::{ErrorKind, Result};
use crate::expand::{DirectoryLister, ExpandingLister};
use crate::open::Opener;
use crate::vpath::Convention;
use exn::ResultExt;
use indicatif::{ProgressBar, ProgressStyle};
use multiread_archive::{Batcher, ContentCache, Progress};
use multiread_config::Settings;
use multiread_container::FormatHandle;
use std::path::Path;
use std::sync::Arc;

const PROGRESS_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

/// Everything one run needs, wired together.
///
/// The session owns the content cache and the progress slot. Components get
/// handles to them from here, so two sessions never share either.
pub struct Session {
    format: FormatHandle,
    settings: Settings,
    convention: Convention,
    cache: ContentCache,
    progress: Progress,
}

impl Session {
    /// Validate `settings` and check the container library version before
    /// anything else happens.
    pub fn new(format: FormatHandle, settings: &Settings) -> Result<Self> {
        settings.validate().or_raise(|| ErrorKind::Config)?;
        check_compatibility(format.as_ref(), &settings.container.minimum_version)?;
        Ok(Self {
            convention: Convention::from(&settings.container),
            settings: settings.clone(),
            format,
            cache: ContentCache::default(),
            progress: Progress::default(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn convention(&self) -> &Convention {
        &self.convention
    }

    pub fn format(&self) -> &FormatHandle {
        &self.format
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn opener(&self) -> Opener {
        Opener::new(self.format.clone(), self.cache.clone())
    }

    pub fn copier(&self) -> ContainerCopier {
        ContainerCopier::new(self.opener(), self.convention.clone())
    }

    /// Directory lister that expands multi-record containers.
    pub fn lister(&self) -> ExpandingLister<DirectoryLister> {
        ExpandingLister::new(DirectoryLister::new(self.convention.suffix()), self.opener(), self.convention.clone())
    }

    pub fn batcher(&self) -> Batcher {
        Batcher::new(self.settings.batch_size, self.cache.clone())
    }

    /// Find the containers under `input` without expanding them.
    pub fn discover(&self, input: &Path) -> Result<Discovered> {
        let lister = DirectoryLister::new(self.convention.suffix());
        Discovered::from_input(input, &lister, self.settings.recursive)
    }

    /// Create a progress bar on stderr and install it as this session's
    /// reporter. The bar stays hidden when stderr isn't a terminal.
    pub fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::no_length(),
        };
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        let bar = bar.with_style(style);
        self.progress.install(Arc::new(bar.clone()));
        bar
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("format", &self.format.name())
            .field("settings", &self.settings)
            .field("cache", &self.cache)
            .field("progress", &self.progress)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::FileLister;
    use multiread_container::Layout;
    use multiread_container::error::ErrorKind as ContainerErrorKind;
    use multiread_container::mock::{MemoryFormat, sample_record};

    fn session() -> Session {
        Session::new(Arc::new(MemoryFormat::default()), &Settings::default()).unwrap()
    }

    #[test]
    fn test_incompatible_library_rejected() {
        let format = Arc::new(MemoryFormat::default().with_version("2.8.0"));
        let err = Session::new(format, &Settings::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Incompatible { .. }));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.container.separator.clear();
        let err = Session::new(Arc::new(MemoryFormat::default()), &settings).unwrap_err();
        assert_eq!(*err, ErrorKind::Config);
    }

    #[test]
    fn test_sessions_do_not_share_caches() {
        let first = session();
        let second = session();
        first.cache().insert("a.fast5", b"bytes".to_vec());
        assert!(second.cache().is_empty());

        // Found in the first session's cache (and rejected as a container);
        // the second one goes to disk and finds nothing.
        let err = first.opener().open(Path::new("a.fast5")).err().unwrap();
        assert!(matches!(&*err, ContainerErrorKind::Format(_)));
        let err = second.opener().open(Path::new("a.fast5")).err().unwrap();
        assert!(matches!(&*err, ContainerErrorKind::NotFound(_)));
    }

    #[test]
    fn test_progress_bar_installs_reporter() {
        let session = session();
        assert!(!session.progress().is_installed());
        let bar = session.progress_bar(None);
        assert!(session.progress().is_installed());
        session.progress().set_length(5);
        assert_eq!(bar.length(), Some(5));
    }

    #[test]
    fn test_lister_uses_convention() {
        let dir = tempfile::tempdir().unwrap();
        MemoryFormat::default()
            .write(dir.path().join("x.fast5"), Layout::Multi, &[sample_record("r1")])
            .unwrap();
        let files = session().lister().list(dir.path(), false).unwrap();
        assert_eq!(files, vec![dir.path().join("x___read_r1.fast5")]);
    }
}
