//! Error types for config-driven tasks.

use life_config::{ConfigError, TaskKind};
use life_jobs::StepError;
use thiserror::Error;

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command failed to start, timed out, or exited non-zero.
    #[error(transparent)]
    Command(#[from] StepError),

    #[error("{} task '{name}' not found in config", .kind.title())]
    TaskNotFound { kind: TaskKind, name: String },

    #[error("Merge category '{0}' not found in config")]
    CategoryNotFound(String),

    #[error("Merge task '{task}' not found in category '{category}'")]
    MergeTaskNotFound { category: String, task: String },

    #[error("Merge entry '{0}' is a single task, not a category")]
    NotACategory(String),

    #[error("No command or commands defined for task '{0}'")]
    NoCommand(String),

    #[error(
        "Invalid date_range format: '{0}'. Expected format: number + unit (e.g., '7d', '1w', '30d')"
    )]
    InvalidDateRange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
