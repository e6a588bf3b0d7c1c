//! Merge, process and status commands - run config-defined tasks.

use anyhow::Result;
use clap::Args;
use console::Style;

use life_config::TaskKind;
use life_tasks::{MergeOutcome, TaskListing, TaskRun, TaskRunner};

use super::{Context, print_json};

/// Arguments for the process and status commands.
#[derive(Args, Debug)]
pub struct TaskArgs {
    /// Task to run (lists tasks when omitted)
    pub task: Option<String>,
}

/// Arguments for the merge command.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Merge category, or a single merge task (lists entries when omitted)
    pub category: Option<String>,

    /// Task within the category (lists the category when omitted)
    pub task: Option<String>,
}

/// Run the process command.
pub fn run_process(args: TaskArgs, ctx: &Context) -> Result<()> {
    run_flat(TaskKind::Process, args, ctx)
}

/// Run the status command.
pub fn run_status(args: TaskArgs, ctx: &Context) -> Result<()> {
    run_flat(TaskKind::Status, args, ctx)
}

fn run_flat(kind: TaskKind, args: TaskArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let runner = TaskRunner::new(&loaded.config, ctx.command_runner());

    let Some(task) = args.task else {
        let title = format!("Available {} tasks:", kind);
        return print_listing(&title, &runner.available(kind), ctx);
    };

    let result = runner.run_task(kind, &task)?;
    if ctx.json_output {
        return print_json(&result);
    }
    print_task_run(&result);
    Ok(())
}

/// Run the merge command.
pub fn run_merge(args: MergeArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let runner = TaskRunner::new(&loaded.config, ctx.command_runner());

    let Some(category) = args.category else {
        return print_listing(
            "Available merge categories:",
            &runner.available(TaskKind::Merge),
            ctx,
        );
    };

    match runner.merge(&category, args.task.as_deref())? {
        MergeOutcome::Listing(tasks) => {
            print_listing(&format!("Available tasks in '{}':", category), &tasks, ctx)
        }
        MergeOutcome::Ran(result) if ctx.json_output => print_json(&result),
        MergeOutcome::Ran(result) => {
            print_task_run(&result);
            Ok(())
        }
    }
}

/// Print task names with their descriptions.
pub fn print_listing(title: &str, tasks: &[TaskListing], ctx: &Context) -> Result<()> {
    if ctx.json_output {
        return print_json(&tasks);
    }

    let dim = Style::new().dim();
    println!("{}", title);
    if tasks.is_empty() {
        println!("  {}", dim.apply_to("(none configured)"));
    }
    for task in tasks {
        println!("  {}: {}", task.name, dim.apply_to(&task.description));
    }
    Ok(())
}

/// Print the outcome of a task run.
pub fn print_task_run(run: &TaskRun) {
    let green = Style::new().green();
    let dim = Style::new().dim();

    if run.dry_run {
        println!("[DRY RUN] {} task '{}': no commands executed", run.kind.title(), run.name);
        return;
    }

    println!("{} {} task '{}' completed", green.apply_to("✓"), run.kind.title(), run.name);
    if let Some(mark) = &run.high_water_mark {
        println!("  {}", dim.apply_to(format!("high-water mark: {}", mark)));
    }

    for output in run.outputs.iter().flatten() {
        for line in output.stdout.lines() {
            println!("  {}", line);
        }
    }
}
