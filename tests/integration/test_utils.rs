//! Shared test utilities for integration tests
//!
//! Project fixtures on disk, a counting config loader, and an engine/host pair that write every
//! extraction and invalidation into one ordered log.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stylesync::config::FileConfigLoader;
use stylesync::engine::{
    ConfigLoader, GenerationContext, GenerationEngine, LoadedConfig, ParseResult, UtilityEngine,
};
use stylesync::error::{ContextError, ExtractionError, PluginError};
use stylesync::host::{ModuleGraph, ModuleHost, Timestamp};
use stylesync::path::FileId;
use stylesync::{PluginOptions, StylePlugin};
use tempfile::TempDir;

/// Generator config with a brand token and two utilities
pub const BASE_CONFIG: &str = r##"
[tokens]
color-brand = "#0055ff"
space-unused = "3rem"

[utilities]
p-4 = "padding: 1rem"
text-brand = "color: var(--color-brand)"
"##;

/// Same as `BASE_CONFIG` plus `m-2` and a new token
pub const EXTENDED_CONFIG: &str = r##"
[tokens]
color-brand = "#ff5500"
color-accent = "#00aa66"

[utilities]
p-4 = "padding: 1rem"
text-brand = "color: var(--color-brand)"
m-2 = "margin: 0.5rem"
text-accent = "color: var(--color-accent)"
"##;

/// A project directory with a generator config and a `src/` folder
pub struct Project {
    _temp_dir: TempDir,
    root: PathBuf,
}

impl Project {
    pub fn new(config: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp_dir.path()).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("stylesync.config.toml"), config).unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// A project without any generator config
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(temp_dir.path()).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn config_path(&self) -> PathBuf {
        self.path("stylesync.config.toml")
    }

    pub fn write_config(&self, config: &str) {
        std::fs::write(self.config_path(), config).unwrap();
    }

    /// Write a file (creating parents) and return its path.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn id(&self, relative: &str) -> FileId {
        FileId::from_path(&self.path(relative))
    }

    pub fn options(&self) -> PluginOptions {
        PluginOptions::with_cwd(&self.root)
    }
}

/// File loader that counts calls and can be slowed down
pub struct CountingLoader {
    inner: FileConfigLoader,
    loads: AtomicUsize,
    delay: Duration,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            inner: FileConfigLoader::new(),
            loads: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigLoader for CountingLoader {
    async fn load(
        &self,
        cwd: &Path,
        config_path: Option<&Path>,
    ) -> Result<LoadedConfig, ContextError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.load(cwd, config_path).await
    }
}

/// Ordered record of extractions and invalidations
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Utility engine whose contexts log `extract:<generation>:<file>`
pub struct LoggingEngine {
    inner: UtilityEngine,
    log: EventLog,
    created: AtomicUsize,
}

impl LoggingEngine {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: UtilityEngine::new(),
            log,
            created: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationEngine for LoggingEngine {
    async fn create_context(
        &self,
        config: &LoadedConfig,
    ) -> Result<Arc<dyn GenerationContext>, ContextError> {
        let generation = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(LoggingContext {
            inner: self.inner.create_context(config).await?,
            log: self.log.clone(),
            generation,
        }))
    }
}

struct LoggingContext {
    inner: Arc<dyn GenerationContext>,
    log: EventLog,
    generation: usize,
}

#[async_trait]
impl GenerationContext for LoggingContext {
    async fn extract(&self, file: &FileId, content: &str) -> Result<ParseResult, ExtractionError> {
        self.log
            .push(format!("extract:{}:{}", self.generation, file));
        self.inner.extract(file, content).await
    }

    async fn render(&self) -> String {
        self.inner.render().await
    }
}

/// Module graph that also logs `invalidate:<module>` into an [`EventLog`]
pub struct LoggingHost {
    pub graph: ModuleGraph,
    log: EventLog,
}

impl LoggingHost {
    pub fn new(log: EventLog) -> Self {
        Self {
            graph: ModuleGraph::new(),
            log,
        }
    }
}

impl ModuleHost for LoggingHost {
    fn invalidate(&self, module_id: &str, timestamp: Timestamp) {
        self.log.push(format!("invalidate:{}", module_id));
        self.graph.invalidate(module_id, timestamp);
    }

    fn report_error(&self, error: &PluginError) {
        self.log.push(format!("error:{}", error));
        self.graph.report_error(error);
    }
}

/// Plugin over `project` with a fresh in-memory module graph
pub fn plugin_with_graph(project: &Project) -> (StylePlugin, Arc<ModuleGraph>) {
    let graph = Arc::new(ModuleGraph::new());
    let plugin = StylePlugin::builder(project.options())
        .host(graph.clone())
        .build()
        .unwrap();
    (plugin, graph)
}

/// Global mutex serializing environment access across tests in this binary
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with the given environment variables set, restoring them afterwards.
pub fn with_env<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let previous: HashMap<String, Option<String>> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();

    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    for (key, value) in previous {
        match value {
            Some(value) => std::env::set_var(&key, value),
            None => std::env::remove_var(&key),
        }
    }
    result
}

/// Run `f` with no `STYLESYNC_*` variable set.
pub fn without_env<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    with_env(&[], || {
        let saved: Vec<(String, String)> = std::env::vars()
            .filter(|(key, _)| key.starts_with("STYLESYNC_"))
            .collect();
        for (key, _) in &saved {
            std::env::remove_var(key);
        }
        let result = f();
        for (key, value) in saved {
            std::env::set_var(key, value);
        }
        result
    })
}
