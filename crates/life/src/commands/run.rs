//! Run command - execute a job by ID.

use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use clap::Args;
use console::Style;
use serde_json::Value;

use life_jobs::{JobError, RunOptions, RunResult, StepStatus, Variables, run_job};

use super::{Context, print_json};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job ID to run
    pub job_id: String,

    /// Variable in KEY=VALUE format (can be repeated)
    #[arg(short = 'V', long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Jobs directory (default: jobs.dir from config)
    #[arg(long)]
    pub jobs_dir: Option<PathBuf>,

    /// Event log file (default: jobs.event_log from config)
    #[arg(long)]
    pub event_log: Option<PathBuf>,
}

/// Split `KEY=VALUE` on the first `=`.
fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Invalid variable format '{}'. Use KEY=VALUE", raw))
}

/// Run the run command.
pub fn run(args: RunArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config_or_default()?;

    let jobs_dir = args.jobs_dir.unwrap_or_else(|| config.jobs.dir_path());
    let event_log = args.event_log.unwrap_or_else(|| config.jobs.event_log_path());

    if !jobs_dir.is_dir() {
        bail!(
            "Jobs directory not found: {}\nCreate it with: mkdir -p {}",
            jobs_dir.display(),
            jobs_dir.display()
        );
    }

    let options = RunOptions {
        dry_run: ctx.dry_run,
        jobs_dir,
        event_log,
        variables: args.vars.into_iter().collect::<Variables>(),
    };

    let result = match run_job(&args.job_id, &options) {
        Ok(result) => result,
        Err(e @ JobError::UnsubstitutedVariables { .. }) => {
            return Err(anyhow!(
                "{}\nUse --var KEY=VALUE to provide missing variables",
                e
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if ctx.json_output {
        return print_json(&result);
    }

    print_run(&result, ctx);
    Ok(())
}

fn print_run(result: &RunResult, ctx: &Context) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();
    let green = Style::new().green();

    if ctx.dry_run {
        println!("[DRY RUN] Would execute job: {}", result.job_id);
    }
    println!("Job: {}", bold.apply_to(&result.job_id));
    println!("Run ID: {}", result.run_id);
    println!("Status: {}", green.apply_to("success"));
    println!();

    for (i, step) in result.steps.iter().enumerate() {
        let icon = match step.status {
            StepStatus::Success => green.apply_to("✓").to_string(),
            StepStatus::Skipped => dim.apply_to("○").to_string(),
        };
        println!("  {} Step {}: {}", icon, i + 1, step.name);

        if ctx.verbose {
            println!("    {}", dim.apply_to(format!("call: {}", step.call)));
            if let Some(args) = &step.args {
                println!("    {}", dim.apply_to(format!("args: {}", args)));
            }
        }

        if let Some(output) = &step.result {
            print_step_result(output);
        }
    }

    if ctx.dry_run {
        println!();
        println!("[DRY RUN] No changes made");
    }
}

fn print_step_result(result: &Value) {
    let Value::Object(fields) = result else {
        println!("    {}", result);
        return;
    };

    for (key, value) in fields {
        match value {
            Value::String(s) if s.is_empty() => {}
            Value::String(s) if s.contains('\n') => {
                println!("    {}:", key);
                for line in s.lines() {
                    println!("      {}", line);
                }
            }
            Value::String(s) => println!("    {}: {}", key, s),
            other => println!("    {}: {}", key, other),
        }
    }
}
