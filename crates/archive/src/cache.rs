//! In-memory content cache.
//!
//! Bridges archive entries to readers that only know how to open things by
//! name: the retriever stores an entry's bytes under the entry name, and a
//! cache-aware opener checks here before going to the filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared name → bytes map.
///
/// Cloning produces another handle to the same cache. Each session owns its
/// own cache, so two sessions never see each other's entries.
///
/// # Examples
///
/// ```
/// use multiread_archive::ContentCache;
/// use std::path::Path;
///
/// let cache = ContentCache::default();
/// cache.insert("reads/a.fast5", b"bytes".to_vec());
/// assert_eq!(cache.get(Path::new("reads/a.fast5")).as_deref(), Some(&b"bytes"[..]));
/// assert_eq!(cache.clear(), 1);
/// assert!(cache.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ContentCache {
    entries: Arc<Mutex<HashMap<PathBuf, Arc<[u8]>>>>,
}

impl ContentCache {
    // A panic while holding the lock can't leave the map half-updated (every
    // operation is a single call on it), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<[u8]>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `bytes` under `name`, replacing any previous entry.
    pub fn insert(&self, name: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) {
        self.lock().insert(name.into(), bytes.into());
    }

    /// Cheap handle to the bytes stored under `name`.
    pub fn get(&self, name: &Path) -> Option<Arc<[u8]>> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &Path) -> bool {
        self.lock().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Total bytes currently held.
    pub fn size(&self) -> usize {
        self.lock().values().map(|bytes| bytes.len()).sum()
    }

    /// Drop every entry, returning how many were evicted.
    pub fn clear(&self) -> usize {
        let mut guard = self.lock();
        let evicted = guard.len();
        guard.clear();
        evicted
    }
}
