//! Progress reporting.
//!
//! The host creates its progress bar *after* input discovery, but the archive
//! retriever needs to grow the bar's total while it streams. [`Progress`] is a
//! slot both sides share: the host installs a reporter whenever it's ready, and
//! updates before that are simply dropped.

use indicatif::ProgressBar;
use std::sync::{Arc, PoisonError, RwLock};

/// Something that can display progress.
pub trait ProgressReporter: Send + Sync {
    /// Set the expected total.
    fn set_length(&self, total: u64);
    /// Advance by `delta` units.
    fn inc(&self, delta: u64);
    fn finish(&self);
}

impl ProgressReporter for ProgressBar {
    fn set_length(&self, total: u64) {
        ProgressBar::set_length(self, total);
    }

    fn inc(&self, delta: u64) {
        ProgressBar::inc(self, delta);
    }

    fn finish(&self) {
        ProgressBar::finish(self);
    }
}

/// Shared, late-installable progress handle.
#[derive(Clone, Default)]
pub struct Progress {
    reporter: Arc<RwLock<Option<Arc<dyn ProgressReporter>>>>,
}

impl Progress {
    /// Install (or replace) the reporter. Every clone of this handle sees it.
    pub fn install(&self, reporter: Arc<dyn ProgressReporter>) {
        *self.reporter.write().unwrap_or_else(PoisonError::into_inner) = Some(reporter);
    }

    pub fn is_installed(&self) -> bool {
        self.current().is_some()
    }

    fn current(&self) -> Option<Arc<dyn ProgressReporter>> {
        self.reporter.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_length(&self, total: u64) {
        if let Some(reporter) = self.current() {
            reporter.set_length(total);
        }
    }

    pub fn inc(&self, delta: u64) {
        if let Some(reporter) = self.current() {
            reporter.inc(delta);
        }
    }

    pub fn finish(&self) {
        if let Some(reporter) = self.current() {
            reporter.finish();
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").field("installed", &self.is_installed()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        lengths: std::sync::Mutex<Vec<u64>>,
    }

    impl ProgressReporter for Recorder {
        fn set_length(&self, total: u64) {
            self.lengths.lock().unwrap().push(total);
        }

        fn inc(&self, _delta: u64) {}

        fn finish(&self) {}
    }

    #[test]
    fn test_updates_before_install_are_dropped() {
        let progress = Progress::default();
        progress.set_length(10);
        assert!(!progress.is_installed());

        let recorder = Arc::new(Recorder::default());
        progress.install(recorder.clone());
        progress.set_length(11);
        assert_eq!(*recorder.lengths.lock().unwrap(), vec![11]);
    }

    #[test]
    fn test_clones_share_reporter() {
        let progress = Progress::default();
        let handle = progress.clone();
        let bar = ProgressBar::hidden();
        progress.install(Arc::new(bar.clone()));

        handle.set_length(3);
        handle.inc(2);
        assert_eq!(bar.length(), Some(3));
        assert_eq!(bar.position(), 2);
    }
}
