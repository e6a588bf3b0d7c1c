//! Life-CLI - YAML-driven personal data pipelines
//!
//! Main entry point for the `life` command.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::Style;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{config, jobs, run, state, sync, tasks};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Life-CLI - lightweight orchestrator for personal data pipelines
///
/// Runs YAML-defined jobs and the sync, merge, process and status tasks
/// declared in life.yml.
#[derive(Parser)]
#[command(name = "life")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/life.yml or ./life.yml)
    #[arg(short, long, global = true, env = "LIFE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what would be executed without running commands
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a job by ID
    Run(run::RunArgs),

    /// List and inspect job definitions
    Jobs(jobs::JobsArgs),

    /// Sync data from external sources
    Sync(sync::SyncArgs),

    /// Merge and transform data
    Merge(tasks::MergeArgs),

    /// Process and transform data
    Process(tasks::TaskArgs),

    /// Run status checks
    Status(tasks::TaskArgs),

    /// Inspect and validate configuration
    Config(config::ConfigArgs),

    /// Inspect incremental sync state
    State(state::StateArgs),

    /// Show version information
    Version,
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let ctx = commands::Context {
        config_path: cli.config,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        json_output: cli.json,
    };

    let result = match cli.command {
        Commands::Run(args) => run::run(args, &ctx),
        Commands::Jobs(args) => jobs::run(args, &ctx),
        Commands::Sync(args) => sync::run(args, &ctx),
        Commands::Merge(args) => tasks::run_merge(args, &ctx),
        Commands::Process(args) => tasks::run_process(args, &ctx),
        Commands::Status(args) => tasks::run_status(args, &ctx),
        Commands::Config(args) => config::run(args, &ctx),
        Commands::State(args) => state::run(args, &ctx),
        Commands::Version => {
            println!("life-cli version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", Style::new().red().apply_to("Error:"), e);
            ExitCode::FAILURE
        }
    }
}

/// Human-readable logs on stderr. `RUST_LOG` replaces the default filter.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "life=debug,life_jobs=debug,life_tasks=debug,life_config=debug,info"
    } else {
        "life=info,life_jobs=info,life_tasks=info,life_config=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_filter(filter),
        )
        .init();
}
