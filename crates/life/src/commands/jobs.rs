//! Jobs command - list and inspect job definitions.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::Style;

use life_jobs::{JobStore, JobSummary};

use super::{Context, print_json};

/// Arguments for the jobs command.
#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Jobs directory (default: jobs.dir from config)
    #[arg(long, global = true)]
    pub jobs_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<JobsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List all available jobs (default)
    List {
        /// Show detailed YAML parse errors
        #[arg(long)]
        errors: bool,
    },

    /// Show a job definition
    Show {
        /// Job ID to show
        job_id: String,
    },
}

/// Run the jobs command.
pub fn run(args: JobsArgs, ctx: &Context) -> Result<()> {
    let jobs_dir = match args.jobs_dir {
        Some(dir) => dir,
        None => ctx.load_config_or_default()?.jobs.dir_path(),
    };

    if !jobs_dir.is_dir() {
        bail!(
            "Jobs directory not found: {}\nCreate it with: mkdir -p {}",
            jobs_dir.display(),
            jobs_dir.display()
        );
    }

    let store = JobStore::new(&jobs_dir);
    match args.command.unwrap_or(JobsCommand::List { errors: false }) {
        JobsCommand::List { errors } => cmd_list(&store, errors, ctx),
        JobsCommand::Show { job_id } => cmd_show(&store, &job_id, ctx),
    }
}

fn cmd_list(store: &JobStore, show_errors: bool, ctx: &Context) -> Result<()> {
    let scan = store.scan()?;

    if !scan.errors.is_empty() {
        if show_errors {
            let red = Style::new().red();
            eprintln!("{}", red.apply_to("YAML parse errors:"));
            for (path, message) in &scan.errors {
                eprintln!("\n{}:", path.display());
                eprintln!("  {}", message);
            }
        }
        bail!(
            "{} job file(s) failed to parse. Use --errors for details.",
            scan.errors.len()
        );
    }

    let jobs: Vec<JobSummary> = scan
        .jobs
        .into_iter()
        .map(|(job_id, job)| JobSummary {
            job_id,
            description: job.description,
        })
        .collect();

    if ctx.json_output {
        return print_json(&jobs);
    }

    if jobs.is_empty() {
        println!("No jobs found.");
        println!("Add job definitions to: {}", store.dir().display());
        return Ok(());
    }

    print_jobs(&jobs, store.dir());
    Ok(())
}

fn print_jobs(jobs: &[JobSummary], dir: &Path) {
    let bold = Style::new().bold();
    let dim = Style::new().dim();

    println!("Available jobs {}:\n", dim.apply_to(format!("({})", dir.display())));
    for job in jobs {
        let description = if job.description.is_empty() {
            "(no description)"
        } else {
            job.description.as_str()
        };
        println!("  {}", bold.apply_to(&job.job_id));
        println!("    {}\n", description);
    }
}

fn cmd_show(store: &JobStore, job_id: &str, ctx: &Context) -> Result<()> {
    let job = store.get(job_id)?;

    if ctx.json_output {
        return print_json(&job);
    }

    let mut doc = serde_yaml::Mapping::new();
    doc.insert(
        serde_yaml::Value::String(job_id.to_string()),
        serde_yaml::to_value(&job)?,
    );

    println!("Job: {}\n", job_id);
    print!("{}", serde_yaml::to_string(&doc)?);
    Ok(())
}
