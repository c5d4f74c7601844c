//! Memoized loading of the combined table.
//!
//! [`DataCache`] maps load parameters to a fully built [`CombinedTable`]. The
//! first request for a key loads it; later requests with the same key share
//! the same `Arc` without touching the filesystem. A failed load leaves the
//! cache untouched so the next request retries.

use crate::data::{load_all, DataConfig};
use crate::error::Result;
use crate::types::CombinedTable;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Parameters identifying one load: base directory plus the ordered file list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadKey {
    pub path: PathBuf,
    pub files: Vec<String>,
}

impl LoadKey {
    pub fn new<S: AsRef<str>>(path: impl AsRef<Path>, files: &[S]) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            files: files.iter().map(|f| f.as_ref().to_string()).collect(),
        }
    }
}

/// Process-wide table cache, shared by reference between callers.
#[derive(Debug, Default)]
pub struct DataCache {
    tables: Mutex<HashMap<LoadKey, Arc<CombinedTable>>>,
}

impl DataCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LoadKey, Arc<CombinedTable>>> {
        // A panic mid-load never inserts, so the map is consistent even if poisoned.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the cached table for `(path, files)`, loading it on first use.
    ///
    /// The lock is held for the duration of a load, so concurrent callers
    /// asking for the same key wait for one load rather than racing.
    pub fn get_or_load<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        files: &[S],
        config: &DataConfig,
    ) -> Result<Arc<CombinedTable>> {
        let key = LoadKey::new(path, files);
        let mut tables = self.lock();

        if let Some(table) = tables.get(&key) {
            debug!("Cache hit for {}", key.path.display());
            return Ok(Arc::clone(table));
        }

        info!("Cache miss for {}, loading {} files", key.path.display(), key.files.len());
        let table = Arc::new(load_all(&key.path, &key.files, config)?);
        tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Whether a table is cached for these parameters.
    pub fn contains<S: AsRef<str>>(&self, path: impl AsRef<Path>, files: &[S]) -> bool {
        self.lock().contains_key(&LoadKey::new(path, files))
    }

    /// Drop the entry for these parameters. Returns true if one was cached.
    pub fn invalidate<S: AsRef<str>>(&self, path: impl AsRef<Path>, files: &[S]) -> bool {
        self.lock().remove(&LoadKey::new(path, files)).is_some()
    }

    /// Drop every cached table.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
