//! Typed configuration model.
//!
//! ```yaml
//! workspace: ~/life
//! jobs:
//!   dir: ~/.life/jobs
//!   event_log: ~/.life/events.jsonl
//! sync:
//!   contacts:
//!     description: Pull CRM contacts
//!     command: dataverse export contacts --output {output} {extra_args}
//!     output: ~/life/data/contacts.json
//!     incremental_field: modifiedon
//!     state_file: ~/.life/state.json
//! merge:
//!   clients:
//!     combine:
//!       command: jq -s add {workspace}/a.json {workspace}/b.json
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::discovery::expand_path;
use crate::error::ConfigError;

/// Default directory holding job YAML files.
pub const DEFAULT_JOBS_DIR: &str = "~/.life/jobs";

/// Default JSONL event log.
pub const DEFAULT_EVENT_LOG: &str = "~/.life/events.jsonl";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LifeConfig {
    /// Base directory exposed to commands as `{workspace}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub sync: BTreeMap<String, TaskConfig>,
    #[serde(default)]
    pub merge: BTreeMap<String, MergeEntry>,
    #[serde(default)]
    pub process: BTreeMap<String, TaskConfig>,
    #[serde(default)]
    pub status: BTreeMap<String, TaskConfig>,
}

/// Locations used by the job runner.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobsConfig {
    #[serde(default = "default_jobs_dir")]
    pub dir: String,
    #[serde(default = "default_event_log")]
    pub event_log: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            dir: default_jobs_dir(),
            event_log: default_event_log(),
        }
    }
}

fn default_jobs_dir() -> String {
    DEFAULT_JOBS_DIR.to_string()
}

fn default_event_log() -> String {
    DEFAULT_EVENT_LOG.to_string()
}

impl JobsConfig {
    /// Jobs directory with `~/` expanded.
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }

    /// Event log path with `~/` expanded.
    pub fn event_log_path(&self) -> PathBuf {
        expand_path(&self.event_log)
    }
}

/// A single sync/merge/process/status task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TaskConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl TaskConfig {
    /// Commands to run, in order. `commands` takes precedence over `command`.
    pub fn command_list(&self) -> Vec<&str> {
        match (&self.commands, &self.command) {
            (Some(commands), _) if !commands.is_empty() => {
                commands.iter().map(String::as_str).collect()
            }
            (_, Some(command)) => vec![command.as_str()],
            _ => Vec::new(),
        }
    }

    /// Whether this task tracks a high-water mark.
    pub fn is_incremental(&self) -> bool {
        self.incremental_field.is_some() && self.state_file.is_some()
    }

    pub fn description_or_default(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }
}

/// An entry under `merge`: either a category of tasks or a single task.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MergeEntry {
    Category(BTreeMap<String, TaskConfig>),
    Task(TaskConfig),
}

/// Task categories in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Sync,
    Merge,
    Process,
    Status,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Sync,
        TaskKind::Merge,
        TaskKind::Process,
        TaskKind::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Sync => "sync",
            TaskKind::Merge => "merge",
            TaskKind::Process => "process",
            TaskKind::Status => "status",
        }
    }

    /// Capitalized name for messages.
    pub fn title(&self) -> &'static str {
        match self {
            TaskKind::Sync => "Sync",
            TaskKind::Merge => "Merge",
            TaskKind::Process => "Process",
            TaskKind::Status => "Status",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ConfigError::Other(format!("unknown task category '{}'", s)))
    }
}

/// A task with its category and display name (`category.task` for merge).
#[derive(Debug, Clone, Copy)]
pub struct TaskRef<'a> {
    pub kind: TaskKind,
    pub name: &'a str,
    pub category: Option<&'a str>,
    pub task: &'a TaskConfig,
}

impl TaskRef<'_> {
    /// `name` for flat tasks, `category.name` for nested merge tasks.
    pub fn qualified_name(&self) -> String {
        match self.category {
            Some(category) => format!("{}.{}", category, self.name),
            None => self.name.to_string(),
        }
    }
}

impl LifeConfig {
    /// Parse a YAML document. An empty document is an empty config.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let parsed: Option<LifeConfig> = serde_yaml::from_str(content)?;
        Ok(parsed.unwrap_or_default())
    }

    /// Workspace directory: configured (expanded) or the current directory.
    pub fn workspace_path(&self) -> PathBuf {
        match &self.workspace {
            Some(ws) => expand_path(ws),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Flat tasks of one kind. Merge entries are not included.
    pub fn tasks_of(&self, kind: TaskKind) -> Option<&BTreeMap<String, TaskConfig>> {
        match kind {
            TaskKind::Sync => Some(&self.sync),
            TaskKind::Process => Some(&self.process),
            TaskKind::Status => Some(&self.status),
            TaskKind::Merge => None,
        }
    }

    /// Every task in the config, in category order then name order.
    pub fn all_tasks(&self) -> Vec<TaskRef<'_>> {
        let mut tasks = Vec::new();

        for kind in TaskKind::ALL {
            if kind == TaskKind::Merge {
                for (entry_name, entry) in &self.merge {
                    match entry {
                        MergeEntry::Category(category) => {
                            for (name, task) in category {
                                tasks.push(TaskRef {
                                    kind,
                                    name,
                                    category: Some(entry_name.as_str()),
                                    task,
                                });
                            }
                        }
                        MergeEntry::Task(task) => tasks.push(TaskRef {
                            kind,
                            name: entry_name,
                            category: None,
                            task,
                        }),
                    }
                }
                continue;
            }

            if let Some(map) = self.tasks_of(kind) {
                for (name, task) in map {
                    tasks.push(TaskRef {
                        kind,
                        name,
                        category: None,
                        task,
                    });
                }
            }
        }

        tasks
    }
}
