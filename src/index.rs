//! Process-local map from document name to its chunk ids.
//!
//! This is a rebuildable cache, not a source of truth: it accelerates
//! deletion while the process lives and is expected to be incomplete after a
//! restart, at which point the eraser falls back to filtered store queries.

use parking_lot::Mutex;
use std::collections::HashMap;

/// Document name → ordered chunk ids, guarded by one mutex so concurrent
/// ingest and erase on the same source cannot interleave into a corrupted
/// id list.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch's ids to the entry for `source`, creating it if
    /// needed. Repeated ingestions under one source name accumulate.
    pub fn append(&self, source: &str, ids: &[String]) {
        let mut entries = self.entries.lock();
        entries
            .entry(source.to_string())
            .or_default()
            .extend(ids.iter().cloned());
    }

    /// Removes and returns the entry for `source`, atomically.
    pub fn take(&self, source: &str) -> Option<Vec<String>> {
        self.entries.lock().remove(source)
    }

    /// Current ids for `source`, if the index has an entry.
    pub fn ids_for(&self, source: &str) -> Option<Vec<String>> {
        self.entries.lock().get(source).cloned()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.lock().contains_key(source)
    }

    /// Names of every indexed document.
    pub fn sources(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }
}
