//! Error types for the stylesync reconciliation loop.

use crate::path::FileId;
use std::path::PathBuf;
use thiserror::Error;

/// Context lifecycle errors
///
/// Cloneable so a single in-flight initialization can hand the same failure to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("Failed to initialize generation context: {0}")]
    Initialization(String),

    #[error("Failed to reload generation context: {0}")]
    Reload(String),

    #[error("Generator configuration not found: {0}")]
    ConfigNotFound(PathBuf),
}

impl ContextError {
    /// Re-tag an error raised while building a context as a reload failure.
    pub fn into_reload(self) -> Self {
        match self {
            ContextError::Initialization(msg) => ContextError::Reload(msg),
            ContextError::ConfigNotFound(path) => {
                ContextError::Reload(format!("configuration not found: {}", path.display()))
            }
            other => other,
        }
    }
}

/// Per-file extraction errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Failed to read {file}: {message}")]
    Read { file: FileId, message: String },

    #[error("Malformed source {file}: {message}")]
    Malformed { file: FileId, message: String },
}

impl ExtractionError {
    pub fn file(&self) -> &FileId {
        match self {
            ExtractionError::Read { file, .. } | ExtractionError::Malformed { file, .. } => file,
        }
    }
}

/// Output writer errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Output I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output target is virtual and has no file on disk")]
    NotPhysical,
}

/// Plugin-level errors
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Invalid options: {0}")]
    Options(String),

    #[error("Watch error: {0}")]
    Watch(String),
}

impl From<config::ConfigError> for PluginError {
    fn from(err: config::ConfigError) -> Self {
        PluginError::Options(err.to_string())
    }
}
