//! Error types for the job runner.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can occur while loading or running a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// One or more job files failed to parse.
    #[error(transparent)]
    Load(#[from] JobLoadError),

    /// The requested job id is not defined in any job file.
    #[error("Job not found: {job_id}. Available: {}", format_list(.available))]
    JobNotFound {
        job_id: String,
        available: Vec<String>,
    },

    /// A step's `call` is outside the allowed namespace.
    #[error("call: '{call}' not allowed. Must start with one of: {}", format_list(.allowed))]
    CallNotAllowed { call: String, allowed: Vec<String> },

    /// A step's `call` is in the allowed namespace but nothing is registered under it.
    #[error("call: '{call}' is not a registered step function")]
    StepNotRegistered { call: String },

    /// `{name}` placeholders survived variable substitution.
    #[error("Step '{step}' has unsubstituted variables: {}", format_list(.names))]
    UnsubstitutedVariables { step: String, names: Vec<String> },

    /// An event type outside the fixed vocabulary was requested.
    #[error("Unknown event_type '{given}'. Allowed: {}", format_list(.allowed))]
    UnknownEventType {
        given: String,
        allowed: Vec<&'static str>,
    },

    /// A step function failed. The message is the step function's own.
    #[error(transparent)]
    Step(#[from] StepError),

    /// Event log or filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Aggregated parse failures across every job file in a directory.
#[derive(Debug, Error)]
#[error("Failed to load job files:\n{}", format_load_errors(.errors))]
pub struct JobLoadError {
    /// `(file, message)` for each file that failed.
    pub errors: Vec<(PathBuf, String)>,
}

/// Errors raised by step functions.
#[derive(Debug, Error)]
pub enum StepError {
    /// Missing or mistyped argument.
    #[error("invalid argument '{name}': {message}")]
    InvalidArgs { name: String, message: String },

    /// A subprocess exited non-zero.
    #[error("Command '{command}' returned non-zero exit status {code}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// A subprocess exceeded its timeout.
    #[error("Command '{command}' timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create an invalid-argument error.
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            name: name.into(),
            message: message.into(),
        }
    }
}

fn format_list<T: std::fmt::Display>(items: &[T]) -> String {
    let quoted: Vec<String> = items.iter().map(|i| format!("'{}'", i)).collect();
    format!("[{}]", quoted.join(", "))
}

fn format_load_errors(errors: &[(PathBuf, String)]) -> String {
    errors
        .iter()
        .map(|(path, err)| format!("  - {}: {}", path.display(), err))
        .collect::<Vec<_>>()
        .join("\n")
}
