//! Generation Engine Seam
//!
//! The CSS engine and its configuration loader are collaborators, not part of the
//! reconciliation loop. They are reached through three traits:
//!
//! - `ConfigLoader` reads the generator configuration (I/O bound, async)
//! - `GenerationEngine` turns a loaded configuration into a fresh `GenerationContext`
//! - `GenerationContext` accumulates usages per file and renders the stylesheet
//!
//! `utility` provides a small token/utility-class engine implementing all three so the crate
//! runs end to end without an external engine.

use crate::config::GeneratorConfig;
use crate::error::{ContextError, ExtractionError};
use crate::path::FileId;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod utility;

pub use utility::UtilityEngine;

/// Result of loading the generator configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Absolute path of the configuration file
    pub path: PathBuf,
    /// Declared dependencies, resolved to absolute paths
    pub dependencies: Vec<PathBuf>,
    /// Parsed configuration
    pub config: GeneratorConfig,
}

/// Style usages extracted from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub file: FileId,
    pub usages: BTreeSet<String>,
}

impl ParseResult {
    pub fn empty(file: FileId) -> Self {
        Self {
            file,
            usages: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.usages.len()
    }
}

/// Configuration loader
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// Load the generator configuration for a project root.
    ///
    /// `config_path` overrides discovery; relative paths resolve against `cwd`.
    async fn load(&self, cwd: &Path, config_path: Option<&Path>)
        -> Result<LoadedConfig, ContextError>;
}

/// CSS generation engine
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    /// Create a brand-new context with an empty usage accumulator.
    async fn create_context(
        &self,
        config: &LoadedConfig,
    ) -> Result<Arc<dyn GenerationContext>, ContextError>;
}

/// One generation context: configuration + usage accumulator + renderer
#[async_trait]
pub trait GenerationContext: Send + Sync {
    /// Extract usages from `content` and add them to the accumulator.
    ///
    /// Re-extracting a file replaces the usages previously accumulated for it.
    async fn extract(&self, file: &FileId, content: &str) -> Result<ParseResult, ExtractionError>;

    /// Render a stylesheet from every accumulated usage.
    async fn render(&self) -> String;
}
