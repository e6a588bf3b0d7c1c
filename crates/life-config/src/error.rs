//! Configuration error types.

use std::path::PathBuf;

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration discovery and loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No config file exists at any candidate location.
    #[error(
        "No config file found. Tried:\n{}\nUse --config to specify a custom location.",
        format_tried(.tried)
    )]
    NotFound { tried: Vec<PathBuf> },

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse YAML.
    #[error("Error parsing config file {path}: {message}")]
    ParseYaml { path: String, message: String },

    /// A task name is not defined under its category.
    #[error("{kind} task '{name}' not found in config")]
    TaskNotFound { kind: String, name: String },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    /// True when no config file could be located.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

fn format_tried(tried: &[PathBuf]) -> String {
    tried
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}
