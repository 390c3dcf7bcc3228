//! Change Router
//!
//! Pure classification of change events into the actions the reconciliation loop must take.
//! Two event classes exist:
//!
//! - Class A: a watcher event for a configuration file or one of its declared dependencies.
//!   Reload the context, invalidate and re-extract every tracked file, invalidate the output.
//! - Class B: the bundler's hot-update signal for a tracked source file. Invalidate the output
//!   only; the bundler re-transforms the file itself, which re-extracts it.
//!
//! Everything else is ignored. Keeping this a function of `(event, registry, watched)` keeps
//! the policy testable without a filesystem watcher.

use crate::context::WatchedSources;
use crate::path::FileId;
use crate::registry::TrackedFiles;

/// Where a change notification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSource {
    /// Raw filesystem watcher
    Watcher,
    /// Bundler hot-update signal for a module
    HotUpdate,
}

/// A change notification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub source: ChangeSource,
    pub file: FileId,
}

impl ChangeEvent {
    pub fn watcher(file: FileId) -> Self {
        Self {
            source: ChangeSource::Watcher,
            file,
        }
    }

    pub fn hot_update(file: FileId) -> Self {
        Self {
            source: ChangeSource::HotUpdate,
            file,
        }
    }
}

/// Event class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Configuration or dependency change
    Config,
    /// Tracked source change
    Source,
    /// Not relevant
    Unrelated,
}

/// Actions required by one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteActions {
    /// Reload the generation context first
    pub reload: bool,
    /// Source modules to mark stale
    pub invalidate_modules: Vec<FileId>,
    /// Tracked files to re-extract against the (new) context
    pub re_extract: Vec<FileId>,
    /// Mark the stylesheet stale
    pub invalidate_output: bool,
}

impl RouteActions {
    pub fn is_noop(&self) -> bool {
        !self.reload
            && !self.invalidate_output
            && self.invalidate_modules.is_empty()
            && self.re_extract.is_empty()
    }

    pub fn class(&self) -> ChangeClass {
        if self.reload {
            ChangeClass::Config
        } else if self.invalidate_output {
            ChangeClass::Source
        } else {
            ChangeClass::Unrelated
        }
    }
}

/// Classify an event.
pub fn classify(event: &ChangeEvent, tracked: &TrackedFiles, watched: &WatchedSources) -> ChangeClass {
    match event.source {
        ChangeSource::Watcher if watched.contains(&event.file) => ChangeClass::Config,
        ChangeSource::HotUpdate if tracked.has(&event.file) => ChangeClass::Source,
        _ => ChangeClass::Unrelated,
    }
}

/// Decide what an event requires.
pub fn route(event: &ChangeEvent, tracked: &TrackedFiles, watched: &WatchedSources) -> RouteActions {
    match classify(event, tracked, watched) {
        ChangeClass::Config => {
            let files = tracked.ids();
            RouteActions {
                reload: true,
                invalidate_modules: files.clone(),
                re_extract: files,
                invalidate_output: true,
            }
        }
        ChangeClass::Source => RouteActions {
            invalidate_output: true,
            ..RouteActions::default()
        },
        ChangeClass::Unrelated => RouteActions::default(),
    }
}
