//! Generator configuration file (`stylesync.config.toml`)
//!
//! ```toml
//! prefix = "tw"
//! dependencies = ["tokens/colors.toml"]
//!
//! [tokens]
//! color-brand = "#0055ff"
//!
//! [utilities]
//! text-brand = "color: var(--color-brand)"
//! spin = "animation: spin 1s linear infinite"
//!
//! [keyframes]
//! spin = "from { transform: rotate(0deg) } to { transform: rotate(360deg) }"
//! ```

use crate::engine::{ConfigLoader, LoadedConfig};
use crate::error::ContextError;
use crate::path::resolve_against;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File discovered in the project root when no explicit config path is given
pub const DEFAULT_CONFIG_FILE: &str = "stylesync.config.toml";

/// CSS engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Optional class prefix (`tw-text-brand` when prefix is `tw`)
    #[serde(default)]
    pub prefix: Option<String>,

    /// Extra files whose changes must reload the configuration
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,

    /// Design tokens rendered as custom properties
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,

    /// Utility class name to declarations
    #[serde(default)]
    pub utilities: BTreeMap<String, String>,

    /// Animation name to keyframes body
    #[serde(default)]
    pub keyframes: BTreeMap<String, String>,
}

impl GeneratorConfig {
    /// Parse a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ContextError> {
        toml::from_str(source).map_err(|e| ContextError::Initialization(e.to_string()))
    }
}

/// Loads `GeneratorConfig` from a TOML file on disk
#[derive(Debug, Clone, Default)]
pub struct FileConfigLoader;

impl FileConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Locate the config file: the explicit path (relative to cwd) or the default file name.
    pub fn locate(cwd: &Path, config_path: Option<&Path>) -> Result<PathBuf, ContextError> {
        let candidate = match config_path {
            Some(path) => resolve_against(cwd, path),
            None => cwd.join(DEFAULT_CONFIG_FILE),
        };
        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(ContextError::ConfigNotFound(candidate))
        }
    }
}

#[async_trait]
impl ConfigLoader for FileConfigLoader {
    async fn load(
        &self,
        cwd: &Path,
        config_path: Option<&Path>,
    ) -> Result<LoadedConfig, ContextError> {
        let path = Self::locate(cwd, config_path)?;
        let source = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ContextError::Initialization(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = GeneratorConfig::from_toml(&source).map_err(|e| match e {
            ContextError::Initialization(msg) => {
                ContextError::Initialization(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        let config_dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.to_path_buf());
        let dependencies = config
            .dependencies
            .iter()
            .map(|dep| resolve_against(&config_dir, dep))
            .collect::<Vec<_>>();

        debug!(
            config_path = %path.display(),
            dependencies = dependencies.len(),
            "Loaded generator configuration"
        );

        Ok(LoadedConfig {
            path,
            dependencies,
            config,
        })
    }
}
