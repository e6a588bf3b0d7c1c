//! Job execution.
//!
//! A run walks a job's steps in order. For each step the run's variables are
//! substituted into `args`, any placeholder left unresolved fails the run, and
//! then the step function is resolved through the [`StepRegistry`] and called.
//! Substitution and the unresolved check happen per step, so earlier steps
//! have already run by the time a later step's missing variable is found.
//!
//! Every run emits `job.started`, one `step.completed` per executed step, and
//! either `job.completed` or `job.failed` to the [`EventSink`].

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::definition::{JobDefinition, JobSource, JobStore};
use crate::error::{JobError, Result};
use crate::events::{Event, EventKind, EventLog, EventSink};
use crate::registry::StepRegistry;
use crate::template::{self, Variables};

/// Terminal status of a successful run. Failures are returned as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
}

/// Per-step outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Skipped,
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    #[serde(rename = "step")]
    pub name: String,
    pub call: String,
    pub status: StepStatus,
    /// Substituted args, recorded only for dry runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// Step function return value, recorded only for live runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl StepOutcome {
    pub fn is_skipped(&self) -> bool {
        self.status == StepStatus::Skipped
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub job_id: String,
    pub run_id: String,
    pub status: RunStatus,
    pub steps: Vec<StepOutcome>,
}

/// Build a run id: `{job_id}-{YYYYMMDDHHMMSS}-{8 hex chars}`.
pub fn generate_run_id(job_id: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        job_id,
        Utc::now().format("%Y%m%d%H%M%S"),
        &suffix[..8]
    )
}

/// Executes jobs against a step registry, reporting to an event sink.
pub struct JobRunner<'a> {
    registry: &'a StepRegistry,
    events: &'a dyn EventSink,
}

impl<'a> JobRunner<'a> {
    pub fn new(registry: &'a StepRegistry, events: &'a dyn EventSink) -> Self {
        Self { registry, events }
    }

    /// Run `job_id` from `jobs`.
    ///
    /// Load and lookup failures return before any event is written. After
    /// `job.started`, any failure, including a failure to record
    /// `job.completed`, is logged as `job.failed` and then returned unchanged.
    pub fn execute(
        &self,
        jobs: &dyn JobSource,
        job_id: &str,
        dry_run: bool,
        variables: &Variables,
    ) -> Result<RunResult> {
        let run_id = generate_run_id(job_id);

        let mut loaded = jobs.load()?;
        let Some(job) = loaded.remove(job_id) else {
            return Err(JobError::JobNotFound {
                job_id: job_id.to_string(),
                available: loaded.into_keys().collect(),
            });
        };

        info!(job_id, run_id = %run_id, dry_run, "starting job");
        self.events.append(
            &Event::new(EventKind::JobStarted, &run_id, "success")
                .with_payload(json!({"job_id": job_id, "dry_run": dry_run})),
        )?;

        let outcome = self
            .run_steps(&job, &run_id, dry_run, variables)
            .and_then(|steps| {
                self.events.append(
                    &Event::new(EventKind::JobCompleted, &run_id, "success")
                        .with_payload(json!({"job_id": job_id})),
                )?;
                Ok(steps)
            });

        match outcome {
            Ok(steps) => {
                info!(job_id, run_id = %run_id, steps = steps.len(), "job completed");
                Ok(RunResult {
                    job_id: job_id.to_string(),
                    run_id,
                    status: RunStatus::Success,
                    steps,
                })
            }
            Err(e) => {
                let message = e.to_string();
                let mut failed = Event::new(EventKind::JobFailed, &run_id, "failed")
                    .with_payload(json!({"job_id": job_id}));
                if !message.is_empty() {
                    failed = failed.with_error(message);
                }
                if let Err(log_err) = self.events.append(&failed) {
                    warn!(run_id = %run_id, error = %log_err, "failed to record job.failed event");
                }
                warn!(job_id, run_id = %run_id, error = %e, "job failed");
                Err(e)
            }
        }
    }

    fn run_steps(
        &self,
        job: &JobDefinition,
        run_id: &str,
        dry_run: bool,
        variables: &Variables,
    ) -> Result<Vec<StepOutcome>> {
        let mut outcomes = Vec::with_capacity(job.steps.len());

        for step in &job.steps {
            let rendered = template::render(&Value::Object(step.args.clone()), variables);
            if !rendered.is_complete() {
                return Err(JobError::UnsubstitutedVariables {
                    step: step.name.clone(),
                    names: rendered.unresolved.into_iter().collect(),
                });
            }

            if dry_run {
                debug!(run_id, step = %step.name, call = %step.call, "dry run, skipping step");
                outcomes.push(StepOutcome {
                    name: step.name.clone(),
                    call: step.call.clone(),
                    status: StepStatus::Skipped,
                    args: Some(rendered.value),
                    result: None,
                });
                continue;
            }

            let func = self.registry.resolve(&step.call)?;
            let args = match rendered.value {
                Value::Object(map) => map,
                _ => serde_json::Map::new(),
            };

            debug!(run_id, step = %step.name, call = %step.call, "executing step");
            let result = func(&args)?;

            outcomes.push(StepOutcome {
                name: step.name.clone(),
                call: step.call.clone(),
                status: StepStatus::Success,
                args: None,
                result: Some(result),
            });

            self.events.append(
                &Event::new(EventKind::StepCompleted, run_id, "success")
                    .with_payload(json!({"step": step.name, "call": step.call})),
            )?;
        }

        Ok(outcomes)
    }
}

/// Options for [`run_job`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub jobs_dir: PathBuf,
    pub event_log: PathBuf,
    pub variables: Variables,
}

/// Run a job from a jobs directory with the built-in step functions,
/// appending events to `event_log`.
pub fn run_job(job_id: &str, options: &RunOptions) -> Result<RunResult> {
    let registry = StepRegistry::builtin();
    let store = JobStore::new(&options.jobs_dir);
    let log = EventLog::new(&options.event_log);

    JobRunner::new(&registry, &log).execute(&store, job_id, options.dry_run, &options.variables)
}
