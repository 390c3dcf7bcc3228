//! stylesync: incremental stylesheet generation for module bundlers
//!
//! Connects a CSS generation engine to a bundler's dev/build pipeline. Source files are run
//! through usage extraction as the bundler transforms them, and a single aggregated stylesheet is
//! served as a virtual module (or written to disk) and invalidated when configuration or sources
//! change.

pub mod cli;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod filter;
pub mod host;
pub mod logging;
pub mod optimize;
pub mod output;
pub mod path;
pub mod plugin;
pub mod registry;
pub mod router;
pub mod scan;
pub mod transform;
pub mod watch;

pub use config::PluginOptions;
pub use error::PluginError;
pub use plugin::{ExtractOutcome, StylePlugin};
