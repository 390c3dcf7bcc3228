//! Bundler host capability
//!
//! The reconciliation loop only needs two things from the host bundler: a way to mark a module
//! (and its importers) stale, and an error channel. `ModuleGraph` implements both in memory and
//! backs the standalone watch mode as well as the tests.

use crate::error::PluginError;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time, strictly later than any previously returned value.
    pub fn now() -> Self {
        static LAST: AtomicI64 = AtomicI64::new(0);
        let wall = chrono::Utc::now().timestamp_millis();
        let mut previous = LAST.load(Ordering::SeqCst);
        loop {
            let next = wall.max(previous + 1);
            match LAST.compare_exchange(previous, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Timestamp(next),
                Err(actual) => previous = actual,
            }
        }
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }
}

/// Capabilities the host bundler exposes to the reconciliation loop
pub trait ModuleHost: Send + Sync {
    /// Mark `module_id` and its dependents stale as of `timestamp`.
    fn invalidate(&self, module_id: &str, timestamp: Timestamp);

    /// Surface an error on the host's error channel.
    fn report_error(&self, error: &PluginError);
}

/// One applied invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub module_id: String,
    pub timestamp: Timestamp,
}

/// Entries kept in the invalidation log and the error list by default
pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

/// In-memory module graph
///
/// The invalidation log and the error list keep the most recent `history_limit` entries, so a
/// long-running watch session holds a bounded history.
#[derive(Debug)]
pub struct ModuleGraph {
    /// module → last invalidation timestamp
    stale: RwLock<HashMap<String, Timestamp>>,
    /// imported module → importers
    importers: RwLock<HashMap<String, HashSet<String>>>,
    log: Mutex<VecDeque<Invalidation>>,
    errors: Mutex<VecDeque<String>>,
    history_limit: usize,
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph keeping at most `limit` invalidations and errors (at least one of each).
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            stale: RwLock::new(HashMap::new()),
            importers: RwLock::new(HashMap::new()),
            log: Mutex::new(VecDeque::new()),
            errors: Mutex::new(VecDeque::new()),
            history_limit: limit.max(1),
        }
    }

    /// Record that `importer` imports `imported`.
    pub fn add_import(&self, importer: &str, imported: &str) {
        self.importers
            .write()
            .entry(imported.to_string())
            .or_default()
            .insert(importer.to_string());
    }

    /// Last invalidation timestamp of a module
    pub fn stale_since(&self, module_id: &str) -> Option<Timestamp> {
        self.stale.read().get(module_id).copied()
    }

    /// Drain the invalidation log (in application order).
    pub fn take_invalidations(&self) -> Vec<Invalidation> {
        self.log.lock().drain(..).collect()
    }

    /// Module ids of the invalidation log, without draining it.
    pub fn invalidated_modules(&self) -> Vec<String> {
        self.log.lock().iter().map(|i| i.module_id.clone()).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().iter().cloned().collect()
    }

    /// Drain the reported errors.
    pub fn take_errors(&self) -> Vec<String> {
        self.errors.lock().drain(..).collect()
    }

    /// Apply one invalidation; returns false when it was not newer than the last one.
    fn mark(&self, module_id: &str, timestamp: Timestamp) -> bool {
        let mut stale = self.stale.write();
        match stale.get(module_id) {
            Some(existing) if *existing >= timestamp => false,
            _ => {
                stale.insert(module_id.to_string(), timestamp);
                true
            }
        }
    }
}

impl ModuleHost for ModuleGraph {
    fn invalidate(&self, module_id: &str, timestamp: Timestamp) {
        let mut queue = VecDeque::from([module_id.to_string()]);
        let mut visited = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if !self.mark(&current, timestamp) {
                continue;
            }
            push_bounded(
                &mut *self.log.lock(),
                Invalidation {
                    module_id: current.clone(),
                    timestamp,
                },
                self.history_limit,
            );
            if let Some(importers) = self.importers.read().get(&current) {
                queue.extend(importers.iter().cloned());
            }
        }
    }

    fn report_error(&self, error: &PluginError) {
        push_bounded(&mut *self.errors.lock(), error.to_string(), self.history_limit);
    }
}

fn push_bounded<T>(entries: &mut VecDeque<T>, entry: T, limit: usize) {
    while entries.len() >= limit {
        entries.pop_front();
    }
    entries.push_back(entry);
}
