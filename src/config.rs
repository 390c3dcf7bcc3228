//! Configuration System
//!
//! Two layers of configuration live here:
//!
//! - `PluginOptions`: how the bridge itself behaves (cwd, output target, path filters,
//!   optimization, logging). Layered from defaults, an optional `stylesync.toml` in the
//!   project root, and `STYLESYNC_*` environment variables.
//! - `GeneratorConfig`: the CSS engine's own configuration file (tokens, utilities,
//!   keyframes, declared dependencies), loaded through the `ConfigLoader` seam every time a
//!   generation context is created or reloaded.

use crate::error::PluginError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod generator;
mod merge;
mod sources;

pub use facade::OptionsLoader;
pub use generator::{FileConfigLoader, GeneratorConfig, DEFAULT_CONFIG_FILE};

/// Name of the optional options file in the project root
pub const OPTIONS_FILE: &str = "stylesync.toml";

/// Plugin options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOptions {
    /// Project root (defaults to the process working directory)
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Generator config file (defaults to discovery of `stylesync.config.toml` in cwd)
    #[serde(default)]
    pub config_path: Option<PathBuf>,

    /// Write the stylesheet to this file instead of serving a virtual module
    #[serde(default)]
    pub outfile: Option<PathBuf>,

    /// Globs of source files to extract usages from
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Globs of source files to skip
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Strip unused custom properties and keyframes from the rendered stylesheet
    #[serde(default = "default_true")]
    pub optimize_css: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

pub(crate) fn default_include() -> Vec<String> {
    vec!["**/*.{js,jsx,ts,tsx,mjs,cjs,vue,svelte,astro,html,md,mdx}".to_string()]
}

pub(crate) fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
        "**/dist/**".to_string(),
        "**/target/**".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            config_path: None,
            outfile: None,
            include: default_include(),
            exclude: default_exclude(),
            optimize_css: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl PluginOptions {
    /// Options rooted at `cwd`, everything else defaulted.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    /// Resolve the project root, falling back to the process working directory.
    pub fn resolved_cwd(&self) -> Result<PathBuf, PluginError> {
        match &self.cwd {
            Some(cwd) if cwd.is_absolute() => Ok(cwd.clone()),
            Some(cwd) => {
                let base = std::env::current_dir()
                    .map_err(|e| PluginError::Options(format!("Cannot read cwd: {}", e)))?;
                Ok(base.join(cwd))
            }
            None => std::env::current_dir()
                .map_err(|e| PluginError::Options(format!("Cannot read cwd: {}", e))),
        }
    }

    /// Validate the options
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.include.is_empty() {
            return Err(PluginError::Options(
                "include must list at least one glob".to_string(),
            ));
        }
        if let Some(blank) = self
            .include
            .iter()
            .chain(self.exclude.iter())
            .find(|g| g.trim().is_empty())
        {
            return Err(PluginError::Options(format!("blank glob pattern: {:?}", blank)));
        }
        if let Some(outfile) = &self.outfile {
            if outfile.as_os_str().is_empty() {
                return Err(PluginError::Options("outfile cannot be empty".to_string()));
            }
            if outfile.is_dir() {
                return Err(PluginError::Options(format!(
                    "outfile {} is a directory",
                    outfile.display()
                )));
            }
        }
        Ok(())
    }

    /// Outfile resolved against the project root.
    pub fn resolved_outfile(&self, cwd: &Path) -> Option<PathBuf> {
        self.outfile
            .as_ref()
            .map(|p| crate::path::resolve_against(cwd, p))
    }
}
