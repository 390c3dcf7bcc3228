//! Reconciliation loop
//!
//! `StylePlugin` is what a bundler integration drives. It wires the context holder, the tracked
//! file registry, the output resolver and the host's module graph together:
//!
//! - `resolve_id` / `load` serve the stylesheet module
//! - `transform` runs extraction for every source file the bundler processes
//! - `handle_change` applies routed change events (config reloads, hot updates)
//!
//! Configuration reloads hold the cycle lock exclusively for the whole reload, module
//! invalidation and re-extraction sequence. Source transforms hold it shared, so a file is never
//! extracted into a context that is about to be replaced.

use crate::config::{FileConfigLoader, PluginOptions};
use crate::context::{ContextGeneration, ContextHolder, WatchedSources};
use crate::engine::{ConfigLoader, GenerationEngine, UtilityEngine};
use crate::error::{ExtractionError, PluginError};
use crate::filter::PathFilter;
use crate::host::{ModuleGraph, ModuleHost, Timestamp};
use crate::output::{OutputResolver, OutputTarget, OutputWriter};
use crate::path::FileId;
use crate::registry::TrackedFiles;
use crate::router::{route, ChangeEvent, ChangeSource, RouteActions};
use crate::scan::scan_sources;
use crate::transform::SourceTransform;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of running one file through extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Rejected by the include/exclude filter
    Skipped,
    /// Extracted, no usages found; the registry is left untouched
    Empty,
    /// Extracted and recorded in the registry
    Recorded { usages: usize },
    /// Extraction failed; reported to the host, registry untouched
    Failed(ExtractionError),
}

/// Counts from an initial scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: usize,
    pub recorded: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Builder for [`StylePlugin`]
pub struct StylePluginBuilder {
    options: PluginOptions,
    engine: Option<Arc<dyn GenerationEngine>>,
    config_loader: Option<Arc<dyn ConfigLoader>>,
    transform: Option<Arc<dyn SourceTransform>>,
    host: Option<Arc<dyn ModuleHost>>,
}

impl StylePluginBuilder {
    pub fn engine(mut self, engine: Arc<dyn GenerationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn config_loader(mut self, loader: Arc<dyn ConfigLoader>) -> Self {
        self.config_loader = Some(loader);
        self
    }

    /// Rewrite sources before extraction.
    pub fn transform<T: SourceTransform + 'static>(mut self, transform: T) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn host(mut self, host: Arc<dyn ModuleHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Validate the options and fix the output target for the plugin's lifetime.
    pub fn build(self) -> Result<StylePlugin, PluginError> {
        let options = self.options;
        options.validate()?;

        let cwd = options.resolved_cwd()?;
        let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);

        let loader: Arc<dyn ConfigLoader> = match self.config_loader {
            Some(loader) => loader,
            None => Arc::new(FileConfigLoader::new()),
        };
        let engine: Arc<dyn GenerationEngine> = match self.engine {
            Some(engine) => engine,
            None => Arc::new(UtilityEngine::new()),
        };
        let holder = Arc::new(ContextHolder::new(
            loader,
            engine,
            cwd.clone(),
            options.config_path.clone(),
        ));

        let target = OutputTarget::from_options(&options, &cwd);
        let writer = OutputWriter::for_target(&target).ok();
        let filter = PathFilter::new(&cwd, &options.include, &options.exclude)?;
        let resolver = OutputResolver::new(target, Arc::clone(&holder), options.optimize_css);
        let host: Arc<dyn ModuleHost> = match self.host {
            Some(host) => host,
            None => Arc::new(ModuleGraph::new()),
        };

        info!(
            cwd = %cwd.display(),
            target = ?resolver.target(),
            optimize = options.optimize_css,
            "Style plugin ready"
        );

        Ok(StylePlugin {
            options,
            cwd,
            holder,
            tracked: TrackedFiles::new(),
            resolver,
            writer,
            filter,
            transform: self.transform,
            host,
            cycle: RwLock::new(()),
        })
    }
}

/// Bundler-facing reconciliation loop
pub struct StylePlugin {
    options: PluginOptions,
    cwd: PathBuf,
    holder: Arc<ContextHolder>,
    tracked: TrackedFiles,
    resolver: OutputResolver,
    writer: Option<OutputWriter>,
    filter: PathFilter,
    transform: Option<Arc<dyn SourceTransform>>,
    host: Arc<dyn ModuleHost>,
    /// Exclusive for configuration cycles, shared for source transforms
    cycle: RwLock<()>,
}

impl StylePlugin {
    pub fn builder(options: PluginOptions) -> StylePluginBuilder {
        StylePluginBuilder {
            options,
            engine: None,
            config_loader: None,
            transform: None,
            host: None,
        }
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn output_target(&self) -> &OutputTarget {
        self.resolver.target()
    }

    pub fn tracked(&self) -> &TrackedFiles {
        &self.tracked
    }

    pub fn context(&self) -> &Arc<ContextHolder> {
        &self.holder
    }

    pub fn host(&self) -> &Arc<dyn ModuleHost> {
        &self.host
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Config sources of the ready context (empty before the first successful init).
    pub fn watched(&self) -> WatchedSources {
        self.holder
            .current()
            .map(|generation| generation.watched().clone())
            .unwrap_or_default()
    }

    /// Bundler `resolveId` hook
    pub fn resolve_id(&self, source: &str) -> Option<String> {
        self.resolver.target().resolve_id(source)
    }

    /// Bundler `load` hook: the rendered stylesheet, or `None` when `id` is another module.
    pub async fn load(&self, id: &str) -> Result<Option<String>, PluginError> {
        Ok(self.resolver.resolve(id).await?)
    }

    /// Bundler `transform` hook: extract usages from one source file.
    ///
    /// Initialization failures propagate; extraction failures are reported to the host and
    /// returned as [`ExtractOutcome::Failed`].
    pub async fn transform(&self, path: &Path, content: &str) -> Result<ExtractOutcome, PluginError> {
        if !self.filter.should_process_path(path) {
            return Ok(ExtractOutcome::Skipped);
        }

        let _cycle = self.cycle.read().await;
        let generation = self.holder.get().await?;
        let id = self.file_id(path);
        Ok(self.extract_into(&generation, &id, content).await)
    }

    /// Route a change event and apply the resulting actions.
    pub async fn handle_change(&self, event: &ChangeEvent) -> Result<RouteActions, PluginError> {
        // Watcher events may reload; route them under the exclusive lock so the watched set
        // cannot change between classification and reload.
        let _cycle = match event.source {
            ChangeSource::Watcher => Some(self.cycle.write().await),
            ChangeSource::HotUpdate => None,
        };

        let actions = route(event, &self.tracked, &self.watched());
        if actions.is_noop() {
            debug!(file = %event.file, source = ?event.source, "Ignoring unrelated change");
            return Ok(actions);
        }

        if actions.reload {
            info!(
                file = %event.file,
                tracked = actions.re_extract.len(),
                "Configuration changed, reloading"
            );
            let generation = match self.holder.reload().await {
                Ok(generation) => generation,
                Err(e) => {
                    let err = PluginError::from(e);
                    self.host.report_error(&err);
                    return Err(err);
                }
            };

            for file in &actions.invalidate_modules {
                self.host.invalidate(file.as_str(), Timestamp::now());
            }
            for file in &actions.re_extract {
                let Some(content) = self.tracked.get(file) else {
                    continue;
                };
                let outcome = self.extract_into(&generation, file, &content).await;
                debug!(file = %file, outcome = ?outcome, "Re-extracted tracked file");
            }
        }

        if actions.invalidate_output {
            self.invalidate_output().await?;
        }
        Ok(actions)
    }

    /// A raw filesystem watcher event for `path`.
    pub async fn handle_watcher_change(&self, path: &Path) -> Result<RouteActions, PluginError> {
        self.handle_change(&ChangeEvent::watcher(self.file_id(path)))
            .await
    }

    /// The bundler's hot-update signal for `path`.
    pub async fn handle_hot_update(&self, path: &Path) -> Result<RouteActions, PluginError> {
        self.handle_change(&ChangeEvent::hot_update(self.file_id(path)))
            .await
    }

    /// Render and write the physical stylesheet. Returns false for a virtual target or when the
    /// file already holds the rendered content.
    pub async fn write_output(&self) -> Result<bool, PluginError> {
        let Some(writer) = &self.writer else {
            return Ok(false);
        };
        let css = self.resolver.render().await?;
        Ok(writer.write(&css)?)
    }

    /// Render the stylesheet regardless of the target kind.
    pub async fn render(&self) -> Result<String, PluginError> {
        Ok(self.resolver.render().await?)
    }

    /// Run every source file under cwd through [`StylePlugin::transform`].
    pub async fn scan(&self) -> Result<ScanSummary, PluginError> {
        let files = scan_sources(&self.cwd, &self.filter);
        let mut summary = ScanSummary {
            files: files.len(),
            ..ScanSummary::default()
        };

        for path in files {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    let err = ExtractionError::Read {
                        file: FileId::from_path(&path),
                        message: e.to_string(),
                    };
                    warn!(error = %err, "Skipping unreadable source");
                    self.host.report_error(&PluginError::Extraction(err));
                    summary.failed += 1;
                    continue;
                }
            };
            match self.transform(&path, &content).await? {
                ExtractOutcome::Recorded { .. } => summary.recorded += 1,
                ExtractOutcome::Empty | ExtractOutcome::Skipped => summary.empty += 1,
                ExtractOutcome::Failed(_) => summary.failed += 1,
            }
        }

        info!(
            files = summary.files,
            recorded = summary.recorded,
            failed = summary.failed,
            "Initial scan complete"
        );
        Ok(summary)
    }

    /// Identifier of `path`; relative paths are taken relative to the plugin cwd.
    fn file_id(&self, path: &Path) -> FileId {
        FileId::from_path_in(&self.cwd, path)
    }

    /// Transform hook, extraction and registry update for one file.
    async fn extract_into(
        &self,
        generation: &ContextGeneration,
        id: &FileId,
        content: &str,
    ) -> ExtractOutcome {
        let transformed = self
            .transform
            .as_ref()
            .map(|hook| hook.transform(&id.to_path_buf(), content));
        let code = match &transformed {
            Some(output) => output.code(content),
            None => content,
        };

        match generation.context().extract(id, code).await {
            Ok(result) if result.is_empty() => ExtractOutcome::Empty,
            Ok(result) => {
                self.tracked.record(id.clone(), content.to_string());
                ExtractOutcome::Recorded {
                    usages: result.len(),
                }
            }
            Err(e) => {
                warn!(file = %id, error = %e, "Extraction failed");
                self.host.report_error(&PluginError::Extraction(e.clone()));
                ExtractOutcome::Failed(e)
            }
        }
    }

    /// Mark the stylesheet stale; a physical target is rewritten right away.
    async fn invalidate_output(&self) -> Result<(), PluginError> {
        let module_id = self.resolver.target().module_id();
        self.host.invalidate(&module_id, Timestamp::now());
        debug!(module = %module_id, "Invalidated stylesheet");

        if let Err(e) = self.write_output().await {
            self.host.report_error(&e);
            return Err(e);
        }
        Ok(())
    }
}
