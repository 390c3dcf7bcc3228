//! Merge rules: defaults applied before any file or environment source.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the option defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("include", super::default_include())?
        .set_default("exclude", super::default_exclude())?
        .set_default("optimize_css", true)?
        .set_default("logging.level", "info")
}
