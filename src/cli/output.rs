//! CLI output: error mapping from plugin errors to the CLI surface.

use crate::error::{ContextError, PluginError};

/// Map a plugin error to the message printed on stderr.
pub fn map_error(e: &PluginError) -> String {
    match e {
        PluginError::Context(ContextError::ConfigNotFound(path)) => format!(
            "{}\nCreate {} or pass --config <FILE>.",
            e,
            path.display()
        ),
        _ => e.to_string(),
    }
}
