//! Declarative YAML job runner for Life-CLI.
//!
//! Jobs are named, ordered lists of steps. Each step calls a registered step
//! function with templated arguments:
//!
//! ```text
//! ┌──────────────┐   ┌───────────┐   ┌──────────────┐   ┌──────────────┐
//! │  JobStore    │──▶│ JobRunner │──▶│ StepRegistry │──▶│ step fn      │
//! │  (*.yaml)    │   │ template  │   │ (allow-list) │   │ shell.run …  │
//! └──────────────┘   └─────┬─────┘   └──────────────┘   └──────────────┘
//!                          ▼
//!                    ┌───────────┐
//!                    │ EventLog  │ events.jsonl
//!                    └───────────┘
//! ```
//!
//! Only call paths under `life_jobs.` can be resolved, and only to functions
//! registered in the [`StepRegistry`] passed to the runner.

pub mod definition;
pub mod error;
pub mod events;
pub mod registry;
pub mod runner;
pub mod steps;
pub mod template;

pub use definition::{
    JobDefinition, JobScan, JobSource, JobStore, JobSummary, Jobs, StepDefinition, get_job,
    list_jobs, load_jobs,
};
pub use error::{JobError, JobLoadError, Result, StepError};
pub use events::{Event, EventKind, EventLog, EventSink, MemorySink};
pub use registry::{ALLOWED_CALL_PREFIXES, StepFn, StepRegistry};
pub use runner::{
    JobRunner, RunOptions, RunResult, RunStatus, StepOutcome, StepStatus, generate_run_id,
    run_job,
};
pub use steps::shell::ShellOutput;
pub use steps::{ArgsExt, StepArgs};
pub use template::{Rendered, Variables};
