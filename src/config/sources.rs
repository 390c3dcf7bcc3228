//! Option sources, lowest to highest precedence: project file, environment.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Add `<cwd>/stylesync.toml` to the builder if it exists.
pub fn add_project_file(
    builder: ConfigBuilder<DefaultState>,
    cwd: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let path = cwd.join(super::OPTIONS_FILE);
    if !path.is_file() {
        debug!(options_path = %path.display(), "No project options file");
        return Ok(builder);
    }
    Ok(add_file(builder, &path))
}

/// Add one explicit TOML file to the builder.
pub fn add_file(builder: ConfigBuilder<DefaultState>, path: &Path) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from(path).format(FileFormat::Toml).required(true))
}

/// Add `STYLESYNC_*` environment variables.
///
/// Nested keys use `__`. Lists use `;` since globs may contain `,` inside `{a,b}` groups.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("STYLESYNC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(";")
            .with_list_parse_key("include")
            .with_list_parse_key("exclude"),
    )
}
