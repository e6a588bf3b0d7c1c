//! CLI command handlers.

pub mod config;
pub mod jobs;
pub mod run;
pub mod state;
pub mod sync;
pub mod tasks;

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use life_config::{LifeConfig, LoadedConfig};
use life_tasks::CommandRunner;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file (`--config` / `LIFE_CONFIG`).
    pub config_path: Option<PathBuf>,
    /// Print what would run without running it.
    pub dry_run: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Output as JSON for scripting.
    pub json_output: bool,
}

impl Context {
    /// Load the config file. Fails if none can be found.
    pub fn load_config(&self) -> Result<LoadedConfig> {
        Ok(life_config::load_config(self.config_path.as_deref())?)
    }

    /// Load the config file, falling back to defaults when there is none.
    pub fn load_config_or_default(&self) -> Result<LifeConfig> {
        match life_config::load_config(self.config_path.as_deref()) {
            Ok(loaded) => {
                debug!(path = %loaded.path.display(), "loaded config");
                Ok(loaded.config)
            }
            Err(e) if e.is_not_found() => {
                debug!("no config file found, using defaults");
                Ok(LifeConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn command_runner(&self) -> CommandRunner {
        CommandRunner::new(self.dry_run, self.verbose)
    }
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
