//! Tracked-File Registry
//!
//! Records every source file whose latest extraction produced at least one usage, together with
//! the raw content that was extracted. It is the source of truth for "which inputs contribute to
//! the stylesheet": a configuration change re-extracts exactly these files.
//!
//! Entries are never removed. A file whose usages later disappear (or that is deleted) stays
//! registered under its last non-empty content until it is recorded again.

use crate::path::FileId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A registered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub id: FileId,
    pub last_content: String,
}

/// Registry of files contributing usages
#[derive(Debug, Default)]
pub struct TrackedFiles {
    entries: RwLock<HashMap<FileId, String>>,
}

impl TrackedFiles {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite the entry for `id`.
    ///
    /// Call only after extraction reported non-empty usage for this content.
    pub fn record(&self, id: FileId, content: String) {
        self.entries.write().insert(id, content);
    }

    pub fn has(&self, id: &FileId) -> bool {
        self.entries.read().contains_key(id)
    }

    /// Last recorded content of `id`
    pub fn get(&self, id: &FileId) -> Option<String> {
        self.entries.read().get(id).cloned()
    }

    /// Visit every entry once (arbitrary order).
    ///
    /// The read lock is held for the whole visit; `f` must not call back into the registry
    /// for writing.
    pub fn for_each<F: FnMut(&FileId, &str)>(&self, mut f: F) {
        for (id, content) in self.entries.read().iter() {
            f(id, content);
        }
    }

    /// Copy of every entry, sorted by id
    pub fn snapshot(&self) -> Vec<TrackedFile> {
        let mut files: Vec<TrackedFile> = self
            .entries
            .read()
            .iter()
            .map(|(id, content)| TrackedFile {
                id: id.clone(),
                last_content: content.clone(),
            })
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        files
    }

    /// Sorted ids of every entry
    pub fn ids(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
