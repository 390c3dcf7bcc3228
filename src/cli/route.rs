//! CLI route: run context and command dispatch.

use crate::cli::parse::{Cli, Commands};
use crate::config::{OptionsLoader, PluginOptions};
use crate::error::PluginError;
use crate::output::OutputTarget;
use crate::plugin::StylePlugin;
use crate::watch::{WatchConfig, WatchDaemon};
use std::sync::Arc;
use tracing::{error, info};

/// Runtime context for CLI execution: the resolved options and the plugin built from them.
pub struct RunContext {
    plugin: Arc<StylePlugin>,
}

impl RunContext {
    /// Load options for `cli.cwd` and apply the command-line overrides.
    pub fn options_from_cli(cli: &Cli) -> Result<PluginOptions, PluginError> {
        let cwd = match &cli.cwd {
            cwd if cwd.is_absolute() => cwd.clone(),
            cwd => std::env::current_dir()
                .map_err(|e| PluginError::Options(format!("Cannot read cwd: {}", e)))?
                .join(cwd),
        };

        let mut options = OptionsLoader::load(&cwd)?;
        if let Some(config) = &cli.config {
            options.config_path = Some(config.clone());
        }
        if let Some(outfile) = &cli.outfile {
            options.outfile = Some(outfile.clone());
        }
        if cli.no_optimize {
            options.optimize_css = false;
        }
        options.validate()?;
        Ok(options)
    }

    pub fn new(options: PluginOptions) -> Result<Self, PluginError> {
        let plugin = StylePlugin::builder(options).build()?;
        Ok(Self {
            plugin: Arc::new(plugin),
        })
    }

    pub fn plugin(&self) -> &Arc<StylePlugin> {
        &self.plugin
    }

    /// Run a command; the returned text is printed on stdout.
    pub async fn execute(&self, command: &Commands) -> Result<String, PluginError> {
        match command {
            Commands::Build => self.handle_build().await,
            Commands::Print => {
                self.plugin.scan().await?;
                self.plugin.render().await
            }
            Commands::Watch {
                debounce_ms,
                batch_window_ms,
            } => {
                self.handle_watch(WatchConfig {
                    debounce_ms: *debounce_ms,
                    batch_window_ms: *batch_window_ms,
                })
                .await
            }
        }
    }

    async fn handle_build(&self) -> Result<String, PluginError> {
        let summary = self.plugin.scan().await?;
        match self.plugin.output_target() {
            OutputTarget::Physical(path) => {
                let written = self.plugin.write_output().await?;
                Ok(format!(
                    "{} {} ({} of {} files contribute)",
                    if written { "Wrote" } else { "Unchanged" },
                    path.display(),
                    summary.recorded,
                    summary.files
                ))
            }
            OutputTarget::Virtual => self.plugin.render().await,
        }
    }

    async fn handle_watch(&self, config: WatchConfig) -> Result<String, PluginError> {
        // A broken initial configuration is not fatal here; the daemon rebuilds on the next change
        match self.plugin.scan().await {
            Ok(_) => {
                self.plugin.write_output().await?;
            }
            Err(e) => error!(error = %e, "Initial build failed, waiting for changes"),
        }

        let daemon = Arc::new(WatchDaemon::new(Arc::clone(&self.plugin), config));
        let stopper = Arc::clone(&daemon);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping watch mode");
                stopper.stop();
            }
        });
        daemon.run().await?;
        Ok(format!("Stopped watching {}", self.plugin.cwd().display()))
    }
}
