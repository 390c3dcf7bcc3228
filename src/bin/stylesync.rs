//! stylesync CLI Binary
//!
//! Builds or watches a project's utility stylesheet from the command line.

use anyhow::Context;
use clap::Parser;
use std::process;
use stylesync::cli::{map_error, Cli, RunContext};
use stylesync::config::OptionsLoader;
use stylesync::logging::{init_logging, LoggingConfig};
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("stylesync starting");

    if let Err(e) = run(&cli) {
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let context = RunContext::options_from_cli(cli)
        .and_then(RunContext::new)
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
        .context("Failed to initialize stylesync")?;

    match runtime.block_on(context.execute(&cli.command)) {
        Ok(output) => {
            info!("Command completed successfully");
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            Err(anyhow::anyhow!(map_error(&e)))
        }
    }
}

/// Build logging configuration from CLI args and the options file.
/// Precedence: CLI flags override the options file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = OptionsLoader::load(&cli.cwd)
        .map(|options| options.logging)
        .unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    config
}
