//! Context Holder
//!
//! Owns the single generation context behind an init gate. The gate is a small state machine:
//!
//! ```text
//! Uninitialized ──get()──▶ Initializing(attempt) ──ok──▶ Ready(generation)
//!        ▲                        │                         │
//!        │                        └──err──▶ Failed ──get()──┘ (retry)
//!        └──────────────── reload() installs a new Ready generation ─────────
//! ```
//!
//! Concurrent `get()` calls during `Initializing` await the same shared future, so a burst of
//! requests loads the configuration exactly once and every caller sees the same context (or the
//! same error). Failures are never cached: the next `get()` after `Failed` starts a new attempt.

use crate::engine::{ConfigLoader, GenerationContext, GenerationEngine, LoadedConfig};
use crate::error::ContextError;
use crate::path::FileId;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

type InitFuture = Shared<BoxFuture<'static, Result<Arc<ContextGeneration>, ContextError>>>;

/// Configuration files whose changes reload the context
///
/// Computed once per context generation: the config file plus its declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchedSources {
    files: BTreeSet<FileId>,
}

impl WatchedSources {
    pub fn from_loaded(loaded: &LoadedConfig) -> Self {
        let files = std::iter::once(&loaded.path)
            .chain(loaded.dependencies.iter())
            .map(|p| FileId::from_path(p))
            .collect();
        Self { files }
    }

    pub fn from_files<I: IntoIterator<Item = FileId>>(files: I) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.files.contains(file)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileId> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// One lifetime of a generation context, from creation to the next reload
pub struct ContextGeneration {
    generation: u64,
    context: Arc<dyn GenerationContext>,
    watched: WatchedSources,
    config_path: PathBuf,
}

impl ContextGeneration {
    /// Generation number (1 for the first context, incremented on every reload)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn context(&self) -> &Arc<dyn GenerationContext> {
        &self.context
    }

    pub fn watched(&self) -> &WatchedSources {
        &self.watched
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

impl std::fmt::Debug for ContextGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGeneration")
            .field("generation", &self.generation)
            .field("watched", &self.watched)
            .field("config_path", &self.config_path)
            .finish_non_exhaustive()
    }
}

enum ContextState {
    Uninitialized,
    Initializing { attempt: u64, future: InitFuture },
    Ready(Arc<ContextGeneration>),
    Failed,
}

/// Shared inputs for building a context
struct ContextFactory {
    loader: Arc<dyn ConfigLoader>,
    engine: Arc<dyn GenerationEngine>,
    cwd: PathBuf,
    config_path: Option<PathBuf>,
    created: AtomicU64,
}

impl ContextFactory {
    async fn build(&self) -> Result<Arc<ContextGeneration>, ContextError> {
        let loaded = self
            .loader
            .load(&self.cwd, self.config_path.as_deref())
            .await?;
        let context = self.engine.create_context(&loaded).await?;
        let generation = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(ContextGeneration {
            generation,
            context,
            watched: WatchedSources::from_loaded(&loaded),
            config_path: loaded.path,
        }))
    }
}

/// Lazily initialized, reloadable generation context
pub struct ContextHolder {
    factory: Arc<ContextFactory>,
    state: Mutex<ContextState>,
    attempts: AtomicU64,
}

impl ContextHolder {
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        engine: Arc<dyn GenerationEngine>,
        cwd: PathBuf,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            factory: Arc::new(ContextFactory {
                loader,
                engine,
                cwd,
                config_path,
                created: AtomicU64::new(0),
            }),
            state: Mutex::new(ContextState::Uninitialized),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return the current context, initializing it on first demand.
    pub async fn get(&self) -> Result<Arc<ContextGeneration>, ContextError> {
        let (attempt, future) = {
            let mut state = self.state.lock();
            match &*state {
                ContextState::Ready(generation) => return Ok(Arc::clone(generation)),
                ContextState::Initializing { attempt, future } => (*attempt, future.clone()),
                ContextState::Uninitialized | ContextState::Failed => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let factory = Arc::clone(&self.factory);
                    let future = async move { factory.build().await }.boxed().shared();
                    debug!(attempt, "Starting context initialization");
                    *state = ContextState::Initializing {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = future.await;

        let mut state = self.state.lock();
        let owns_state = matches!(
            &*state,
            ContextState::Initializing { attempt: current, .. } if *current == attempt
        );
        if owns_state {
            match &result {
                Ok(generation) => {
                    info!(
                        generation = generation.generation(),
                        config_path = %generation.config_path().display(),
                        "Generation context initialized"
                    );
                    *state = ContextState::Ready(Arc::clone(generation));
                }
                Err(e) => {
                    error!(attempt, error = %e, "Generation context initialization failed");
                    *state = ContextState::Failed;
                }
            }
        }
        result
    }

    /// Discard the current context and build a new one from configuration.
    ///
    /// On failure the previous state is kept and `ContextError::Reload` is returned.
    pub async fn reload(&self) -> Result<Arc<ContextGeneration>, ContextError> {
        match self.factory.build().await {
            Ok(generation) => {
                info!(
                    generation = generation.generation(),
                    watched = generation.watched().len(),
                    "Generation context reloaded"
                );
                *self.state.lock() = ContextState::Ready(Arc::clone(&generation));
                Ok(generation)
            }
            Err(e) => {
                let e = e.into_reload();
                error!(error = %e, "Generation context reload failed");
                Err(e)
            }
        }
    }

    /// The ready context, without triggering initialization.
    pub fn current(&self) -> Option<Arc<ContextGeneration>> {
        match &*self.state.lock() {
            ContextState::Ready(generation) => Some(Arc::clone(generation)),
            _ => None,
        }
    }

    /// Number of contexts created so far.
    pub fn generation(&self) -> u64 {
        self.factory.created.load(Ordering::SeqCst)
    }

    pub fn cwd(&self) -> &Path {
        &self.factory.cwd
    }
}
