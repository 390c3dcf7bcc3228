//! File identifiers
//!
//! Every source and configuration file is keyed by a `FileId`: the path with forward slashes,
//! Unicode normalized to NFC and without trailing separators. Watcher paths, bundler module ids
//! and config dependency paths all go through the same normalization so they compare equal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Stable identifier of a file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    /// Build an identifier from a path.
    ///
    /// Existing absolute paths are canonicalized (symlinks, `..`) with `dunce` so that watcher
    /// events and bundler ids referring to the same file collapse to one identifier.
    pub fn from_path(path: &Path) -> Self {
        let resolved = if path.is_absolute() {
            dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
        } else {
            path.to_path_buf()
        };
        FileId(normalize_path_string(&resolved.to_string_lossy()))
    }

    /// Like [`FileId::from_path`], with a relative `path` resolved against `base` first.
    pub fn from_path_in(base: &Path, path: &Path) -> Self {
        Self::from_path(&resolve_against(base, path))
    }

    /// Build an identifier from a raw module id without touching the filesystem.
    pub fn from_raw(id: &str) -> Self {
        FileId(normalize_path_string(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for FileId {
    fn from(path: &Path) -> Self {
        FileId::from_path(path)
    }
}

impl From<PathBuf> for FileId {
    fn from(path: PathBuf) -> Self {
        FileId::from_path(&path)
    }
}

/// Normalize a path string (no filesystem access)
///
/// Converts `\` to `/`, normalizes Unicode to NFC and removes trailing slashes (except root).
pub fn normalize_path_string(path: &str) -> String {
    let mut result: String = path.nfc().collect::<String>().replace('\\', "/");
    while result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

/// Strip a bundler query suffix (`/src/a.ts?vue&type=style`) from a module id.
pub fn strip_query(id: &str) -> &str {
    match id.find('?') {
        Some(idx) => &id[..idx],
        None => id,
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
