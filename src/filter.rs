//! Include/exclude filtering of source files

use crate::error::PluginError;
use crate::path::{normalize_path_string, strip_query};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Decides which files go through usage extraction
#[derive(Debug, Clone)]
pub struct PathFilter {
    cwd: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    /// Build a filter; globs are matched against paths relative to `cwd`.
    pub fn new(cwd: &Path, include: &[String], exclude: &[String]) -> Result<Self, PluginError> {
        Ok(Self {
            cwd: cwd.to_path_buf(),
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    /// Whether `id` (a path or bundler module id) should be processed.
    pub fn should_process(&self, id: &str) -> bool {
        if id.starts_with('\0') || id.starts_with("virtual:") {
            return false;
        }
        let path = Path::new(strip_query(id));
        let relative = path.strip_prefix(&self.cwd).unwrap_or(path);
        let candidate = normalize_path_string(&relative.to_string_lossy());

        self.include.is_match(&candidate) && !self.exclude.is_match(&candidate)
    }

    pub fn should_process_path(&self, path: &Path) -> bool {
        self.should_process(&path.to_string_lossy())
    }

    /// Whether everything under the directory `path` is excluded, so a walk can prune it.
    pub fn excludes_dir(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.cwd).unwrap_or(path);
        if relative.as_os_str().is_empty() {
            return false;
        }
        let probe = format!("{}/.", normalize_path_string(&relative.to_string_lossy()));
        self.exclude.is_match(&probe)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, PluginError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| PluginError::Options(format!("Invalid glob {:?}: {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| PluginError::Options(format!("Invalid glob set: {}", e)))
}
