//! Options loader facade: merges defaults, files and environment into `PluginOptions`.

use super::{merge, sources, PluginOptions};
use crate::error::PluginError;
use std::path::Path;
use tracing::debug;

/// Loads `PluginOptions` from layered sources
pub struct OptionsLoader;

impl OptionsLoader {
    /// Load options for a project root.
    ///
    /// Precedence (lowest to highest): defaults, `<cwd>/stylesync.toml`, `STYLESYNC_*` env.
    /// `cwd` is filled in with the given root unless a source sets it.
    pub fn load(cwd: &Path) -> Result<PluginOptions, PluginError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_project_file(builder, cwd)?;
        let builder = sources::add_environment(builder);

        let mut options: PluginOptions = builder.build()?.try_deserialize()?;
        if options.cwd.is_none() {
            options.cwd = Some(cwd.to_path_buf());
        }
        options.validate()?;
        debug!(cwd = %cwd.display(), "Loaded plugin options");
        Ok(options)
    }

    /// Load options from one explicit file over the defaults (no environment layer).
    pub fn load_from_file(path: &Path) -> Result<PluginOptions, PluginError> {
        let builder = merge::builder_with_defaults()?;
        let builder = sources::add_file(builder, path);
        let options: PluginOptions = builder.build()?.try_deserialize()?;
        options.validate()?;
        Ok(options)
    }
}
