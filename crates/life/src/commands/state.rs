//! State command - inspect and reset incremental sync state.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;

use life_config::expand_path;
use life_tasks::StateTracker;

use super::{Context, print_json};

/// Arguments for the state command.
#[derive(Args, Debug)]
pub struct StateArgs {
    /// State file (the `state_file` of a sync task)
    #[arg(long, global = true, default_value = "~/.life/state.json")]
    pub file: String,

    #[command(subcommand)]
    pub command: StateCommand,
}

#[derive(Subcommand, Debug)]
pub enum StateCommand {
    /// Print the whole state file as JSON
    Show,

    /// Forget the stored state of one task, forcing a full sync next time
    Clear {
        /// Task name
        task: String,
    },
}

/// Run the state command.
pub fn run(args: StateArgs, ctx: &Context) -> Result<()> {
    let path: PathBuf = expand_path(&args.file);
    let mut tracker = StateTracker::new(&path);

    match args.command {
        StateCommand::Show => print_json(&tracker.all()),
        StateCommand::Clear { task } => {
            let removed = if ctx.dry_run {
                tracker.all().contains_key(&task)
            } else {
                tracker.clear_task(&task)?
            };

            let dim = Style::new().dim();
            match (removed, ctx.dry_run) {
                (true, true) => println!("[DRY RUN] Would clear state for '{}'", task),
                (true, false) => println!("Cleared state for '{}'", task),
                (false, _) => println!(
                    "No state for '{}' {}",
                    task,
                    dim.apply_to(format!("({})", path.display()))
                ),
            }
            Ok(())
        }
    }
}
