//! Output target, resolver and writer
//!
//! The stylesheet is a derived artifact with no state of its own: every resolution re-renders it
//! from the current generation context. The target identity (virtual module id or absolute file
//! path) is fixed once at startup.

use crate::config::PluginOptions;
use crate::context::ContextHolder;
use crate::error::{ContextError, OutputError};
use crate::optimize::strip_unused;
use crate::path::{strip_query, FileId};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Import specifier of the virtual stylesheet
pub const VIRTUAL_ID: &str = "virtual:stylesync.css";

/// Resolved id of the virtual stylesheet (NUL prefix keeps other plugins away from it)
pub const RESOLVED_VIRTUAL_ID: &str = "\0virtual:stylesync.css";

/// Where the stylesheet is served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// In-memory module served by the bundler
    Virtual,
    /// File on disk at an absolute path
    Physical(PathBuf),
}

impl OutputTarget {
    /// Resolve the target from options: `outfile` switches to a physical target.
    pub fn from_options(options: &PluginOptions, cwd: &Path) -> Self {
        match options.resolved_outfile(cwd) {
            Some(path) => OutputTarget::Physical(path),
            None => OutputTarget::Virtual,
        }
    }

    /// Map an import specifier to the resolved id, if it names the virtual stylesheet.
    pub fn resolve_id(&self, source: &str) -> Option<String> {
        match self {
            OutputTarget::Virtual if source == VIRTUAL_ID || source == RESOLVED_VIRTUAL_ID => {
                Some(RESOLVED_VIRTUAL_ID.to_string())
            }
            _ => None,
        }
    }

    /// Whether a module id refers to this target
    pub fn matches(&self, id: &str) -> bool {
        let id = strip_query(id);
        match self {
            OutputTarget::Virtual => id == RESOLVED_VIRTUAL_ID || id == VIRTUAL_ID,
            OutputTarget::Physical(path) => {
                FileId::from_raw(id) == FileId::from_path(path)
                    || FileId::from_path(Path::new(id)) == FileId::from_path(path)
            }
        }
    }

    /// Module id used when invalidating the stylesheet
    pub fn module_id(&self) -> String {
        match self {
            OutputTarget::Virtual => RESOLVED_VIRTUAL_ID.to_string(),
            OutputTarget::Physical(path) => FileId::from_path(path).to_string(),
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, OutputTarget::Physical(_))
    }
}

/// Produces the aggregated stylesheet for the configured target
pub struct OutputResolver {
    target: OutputTarget,
    holder: Arc<ContextHolder>,
    optimize: bool,
}

impl OutputResolver {
    pub fn new(target: OutputTarget, holder: Arc<ContextHolder>, optimize: bool) -> Self {
        Self {
            target,
            holder,
            optimize,
        }
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    /// Render the stylesheet if `id` names the target; `Ok(None)` means "not handled".
    pub async fn resolve(&self, id: &str) -> Result<Option<String>, ContextError> {
        if !self.target.matches(id) {
            return Ok(None);
        }
        self.render().await.map(Some)
    }

    /// Render the stylesheet from every accumulated usage.
    pub async fn render(&self) -> Result<String, ContextError> {
        let generation = self.holder.get().await?;
        let css = generation.context().render().await;
        let css = if self.optimize {
            strip_unused(&css)
        } else {
            css
        };
        debug!(
            generation = generation.generation(),
            bytes = css.len(),
            "Rendered stylesheet"
        );
        Ok(css)
    }
}

/// Writes the physical stylesheet, skipping writes that would not change the file
pub struct OutputWriter {
    path: PathBuf,
    last_hash: Mutex<Option<blake3::Hash>>,
}

impl OutputWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_hash: Mutex::new(None),
        }
    }

    /// Writer for a target, or `NotPhysical` for the virtual one.
    pub fn for_target(target: &OutputTarget) -> Result<Self, OutputError> {
        match target {
            OutputTarget::Physical(path) => Ok(Self::new(path.clone())),
            OutputTarget::Virtual => Err(OutputError::NotPhysical),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `css` atomically (temp file + rename). Returns false when the content is unchanged.
    pub fn write(&self, css: &str) -> Result<bool, OutputError> {
        let hash = blake3::hash(css.as_bytes());
        let mut last = self.last_hash.lock();
        if *last == Some(hash) && self.path.exists() {
            debug!(path = %self.path.display(), "Stylesheet unchanged, skipping write");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("css.tmp");
        fs::write(&temp_path, css.as_bytes())?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        info!(
            path = %self.path.display(),
            bytes = css.len(),
            hash = %hex::encode(&hash.as_bytes()[..8]),
            "Wrote stylesheet"
        );
        *last = Some(hash);
        Ok(true)
    }
}
