//! Configuration system for Life-CLI.
//!
//! Provides YAML-based configuration with:
//! - Task categories (`sync`, `merge`, `process`, `status`) mapping names to shell commands
//! - Job runner locations (`jobs.dir`, `jobs.event_log`)
//! - Config discovery (`--config`, `~/life.yml`, `./life.yml`)
//! - Structural validation that warns rather than fails
//! - A registry of known external tools and `PATH` availability checks

pub mod discovery;
pub mod error;
pub mod tools;
pub mod types;
pub mod validation;

pub use discovery::{
    CONFIG_FILE, LoadedConfig, candidate_paths, discover_config, expand_path, load_config,
    load_config_file,
};
pub use error::{ConfigError, Result};
pub use tools::{
    TaskSummary, ToolCheck, ToolInfo, ToolRegistry, extract_tools_from_command,
    extract_tools_from_config, find_on_path, task_summary, validate_tools,
};
pub use types::*;
pub use validation::{suggest_fix, validate_config};
