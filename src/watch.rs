//! Watch Mode Daemon
//!
//! Long-lived loop for standalone use (outside a bundler). Monitors the project root, debounces
//! filesystem events per path and feeds batches into the reconciliation loop:
//!
//! - configuration sources go through `handle_watcher_change` (reload + re-extraction)
//! - source files are re-read and transformed, then signalled with `handle_hot_update`, which is
//!   what a bundler's own pipeline does on a module update
//!
//! Removals are ignored: the registry never evicts, so a deleted file keeps contributing its
//! last recorded usages until the next configuration reload re-extracts it.

use crate::context::WatchedSources;
use crate::error::PluginError;
use crate::path::FileId;
use crate::plugin::StylePlugin;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watch mode configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// Quiet period a path needs before it is processed
    pub debounce_ms: u64,
    /// How often pending events are checked
    pub batch_window_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            batch_window_ms: 50,
        }
    }
}

/// Per-path debouncing of filesystem events
struct EventBatcher {
    debounce: Duration,
    pending: HashMap<PathBuf, Instant>,
}

impl EventBatcher {
    fn new(config: &WatchConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            pending: HashMap::new(),
        }
    }

    /// Record an event; a repeated path restarts its debounce window.
    fn add(&mut self, path: PathBuf, at: Instant) {
        self.pending.insert(path, at);
    }

    /// Remove and return the paths that have been quiet for the debounce window.
    fn take_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let debounce = self.debounce;
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, last)| now.saturating_duration_since(**last) >= debounce)
            .map(|(path, _)| path.clone())
            .collect();
        for path in &ready {
            self.pending.remove(path);
        }
        ready
    }

    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Paths touched by a notify event (removals excluded)
fn changed_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths.clone(),
        // Renames report `[from, to]`; only the destination has content
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => {
            event.paths.last().cloned().into_iter().collect()
        }
        EventKind::Modify(_) => event.paths.clone(),
        _ => Vec::new(),
    }
}

/// Directories outside the project root that hold configuration sources
///
/// The root is watched recursively; a config dependency elsewhere needs its parent directory
/// watched on its own. The set of sources changes with every context generation.
#[derive(Debug)]
struct DependencyDirs {
    cwd: PathBuf,
    dirs: BTreeSet<PathBuf>,
}

impl DependencyDirs {
    fn new(cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            dirs: BTreeSet::new(),
        }
    }

    /// Call `watch` for each out-of-root directory of `sources` not seen before.
    fn sync<F>(&mut self, sources: &WatchedSources, mut watch: F) -> Vec<PathBuf>
    where
        F: FnMut(&Path) -> notify::Result<()>,
    {
        let mut added = Vec::new();
        for source in sources.iter() {
            let path = source.to_path_buf();
            let Some(parent) = path.parent() else {
                continue;
            };
            if parent.starts_with(&self.cwd) || !self.dirs.insert(parent.to_path_buf()) {
                continue;
            }
            match watch(parent) {
                Ok(()) => debug!(dir = %parent.display(), "Watching config dependency directory"),
                Err(e) => warn!(
                    dir = %parent.display(),
                    error = %e,
                    "Cannot watch config dependency directory"
                ),
            }
            added.push(parent.to_path_buf());
        }
        added
    }
}

/// Watch mode daemon
pub struct WatchDaemon {
    plugin: Arc<StylePlugin>,
    config: WatchConfig,
    running: Arc<RwLock<bool>>,
}

impl WatchDaemon {
    pub fn new(plugin: Arc<StylePlugin>, config: WatchConfig) -> Self {
        Self {
            plugin,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Watch until [`WatchDaemon::stop`] is called.
    pub async fn run(&self) -> Result<(), PluginError> {
        *self.running.write() = true;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Err(e) = tx.send(res) {
                error!("Error sending watch event: {}", e);
            }
        })
        .map_err(|e| PluginError::Watch(format!("Failed to create watcher: {}", e)))?;

        let cwd = self.plugin.cwd().to_path_buf();
        watcher
            .watch(&cwd, RecursiveMode::Recursive)
            .map_err(|e| PluginError::Watch(format!("Failed to watch {}: {}", cwd.display(), e)))?;

        let mut dependency_dirs = DependencyDirs::new(&cwd);
        dependency_dirs.sync(&self.plugin.watched(), |dir| {
            watcher.watch(dir, RecursiveMode::NonRecursive)
        });

        info!(cwd = %cwd.display(), "Watching for changes");

        let mut batcher = EventBatcher::new(&self.config);
        let batch_window = Duration::from_millis(self.config.batch_window_ms.max(1));

        while *self.running.read() {
            match tokio::time::timeout(batch_window, rx.recv()).await {
                Ok(Some(Ok(event))) => {
                    let now = Instant::now();
                    for path in changed_paths(&event) {
                        batcher.add(path, now);
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!("Watch error: {}", e);
                }
                Ok(None) => {
                    error!("Watcher channel disconnected");
                    break;
                }
                Err(_) => {}
            }

            if !batcher.is_empty() {
                let ready = batcher.take_ready(Instant::now());
                if !ready.is_empty() {
                    self.process_batch(ready).await;
                    // A reload or rebuild may have declared new dependencies
                    dependency_dirs.sync(&self.plugin.watched(), |dir| {
                        watcher.watch(dir, RecursiveMode::NonRecursive)
                    });
                }
            }
        }

        info!("Watch mode stopped");
        Ok(())
    }

    /// Stop the loop after the current batch.
    pub fn stop(&self) {
        *self.running.write() = false;
    }

    pub fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Feed one debounced batch into the reconciliation loop.
    async fn process_batch(&self, paths: Vec<PathBuf>) {
        debug!(paths = paths.len(), "Processing change batch");

        // No ready context (the initial load failed): any change retries the whole build
        if self.plugin.context().current().is_none() {
            self.rebuild().await;
            return;
        }

        let watched = self.plugin.watched();
        let (config_paths, source_paths): (Vec<PathBuf>, Vec<PathBuf>) = paths
            .into_iter()
            .partition(|path| watched.contains(&FileId::from_path(path)));

        for path in config_paths {
            if let Err(e) = self.plugin.handle_watcher_change(&path).await {
                error!(path = %path.display(), error = %e, "Configuration reload failed");
            }
        }

        for path in source_paths {
            if !self.plugin.filter().should_process_path(&path) {
                continue;
            }
            self.process_source(&path).await;
        }
    }

    async fn process_source(&self, path: &Path) {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Changed file is not readable");
                return;
            }
        };
        if let Err(e) = self.plugin.transform(path, &content).await {
            error!(path = %path.display(), error = %e, "Transform failed");
            return;
        }
        if let Err(e) = self.plugin.handle_hot_update(path).await {
            error!(path = %path.display(), error = %e, "Hot update failed");
        }
    }

    async fn rebuild(&self) {
        match self.plugin.scan().await {
            Ok(summary) => {
                info!(recorded = summary.recorded, "Rebuilt after configuration recovered");
                if let Err(e) = self.plugin.write_output().await {
                    error!(error = %e, "Failed to write stylesheet");
                }
            }
            Err(e) => warn!(error = %e, "Still unable to build"),
        }
    }
}
