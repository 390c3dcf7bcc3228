//! CLI parse: clap types for stylesync. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stylesync - Generate a utility stylesheet from project sources
#[derive(Debug, Parser)]
#[command(name = "stylesync")]
#[command(about = "Generate a utility stylesheet from project sources and keep it in sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root directory
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,

    /// Generator configuration file (default: <cwd>/stylesync.config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the stylesheet to this file
    #[arg(long)]
    pub outfile: Option<PathBuf>,

    /// Keep unused custom properties and keyframes
    #[arg(long)]
    pub no_optimize: bool,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Scan sources and write the stylesheet (stdout when no outfile is set)
    Build,
    /// Build, then keep the stylesheet in sync until Ctrl+C
    Watch {
        /// Debounce window in milliseconds
        #[arg(long, default_value = "100")]
        debounce_ms: u64,
        /// Batch window in milliseconds
        #[arg(long, default_value = "50")]
        batch_window_ms: u64,
    },
    /// Scan sources and print the stylesheet
    Print,
}
