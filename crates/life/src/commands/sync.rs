//! Sync command - run sync tasks from the config file.

use anyhow::Result;
use clap::Args;

use life_config::TaskKind;
use life_tasks::TaskRunner;

use super::tasks::{print_listing, print_task_run};
use super::{Context, print_json};

/// Arguments for the sync command.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Sync task to run (lists tasks when omitted)
    pub task: Option<String>,

    /// Ignore saved state and run a full sync
    #[arg(long)]
    pub full_refresh: bool,
}

/// Run the sync command.
pub fn run(args: SyncArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let runner = TaskRunner::new(&loaded.config, ctx.command_runner());

    let Some(task) = args.task else {
        return print_listing("Available sync tasks:", &runner.available(TaskKind::Sync), ctx);
    };

    let result = runner.sync(&task, args.full_refresh)?;
    if ctx.json_output {
        return print_json(&result);
    }
    print_task_run(&result);
    Ok(())
}
