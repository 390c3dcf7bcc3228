//! Initial source scan
//!
//! Collects the source files under the project root that pass the include/exclude filter, so a
//! build (or the start of watch mode) can populate the registry before any change arrives.

use crate::filter::PathFilter;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Files under `root` accepted by `filter`, sorted by path. Symlinks are not followed.
pub fn scan_sources(root: &Path, filter: &PathFilter) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && filter.excludes_dir(entry.path())));

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry during scan");
                continue;
            }
        };
        if entry.file_type().is_file() && filter.should_process_path(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}
