//! Dispatch of config-defined sync, merge, process and status tasks.

use life_config::{LifeConfig, MergeEntry, TaskConfig, TaskKind, expand_path};
use life_jobs::{ShellOutput, Variables};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::command::CommandRunner;
use crate::dates::parse_date_range;
use crate::error::{Result, TaskError};
use crate::state::{StateTracker, utc_timestamp};

/// Filter appended to incremental syncs when a task sets no `incremental_format`.
pub const DEFAULT_INCREMENTAL_FORMAT: &str = r#"--where "{field} gt {value}""#;

/// A task name with its description, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskListing {
    pub name: String,
    pub description: String,
}

/// What a task invocation did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRun {
    pub kind: TaskKind,
    /// `name`, or `category.name` for nested merge tasks.
    pub name: String,
    pub dry_run: bool,
    /// One entry per command; `None` for commands skipped by dry-run.
    pub outputs: Vec<Option<ShellOutput>>,
    /// New high-water mark written by an incremental sync.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_water_mark: Option<String>,
}

/// Result of `merge <category> [task]`.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Ran(TaskRun),
    /// A category was named without a task.
    Listing(Vec<TaskListing>),
}

/// Runs tasks from a loaded config.
#[derive(Debug, Clone, Copy)]
pub struct TaskRunner<'a> {
    config: &'a LifeConfig,
    commands: CommandRunner,
}

impl<'a> TaskRunner<'a> {
    pub fn new(config: &'a LifeConfig, commands: CommandRunner) -> Self {
        Self { config, commands }
    }

    /// Tasks available under `kind`. Merge lists its top-level entries.
    pub fn available(&self, kind: TaskKind) -> Vec<TaskListing> {
        match self.config.tasks_of(kind) {
            Some(tasks) => tasks
                .iter()
                .map(|(name, task)| listing(name, task))
                .collect(),
            None => self
                .config
                .merge
                .iter()
                .map(|(name, entry)| match entry {
                    MergeEntry::Task(task) => listing(name, task),
                    MergeEntry::Category(tasks) => TaskListing {
                        name: name.clone(),
                        description: format!("{} task(s)", tasks.len()),
                    },
                })
                .collect(),
        }
    }

    /// Run a sync task.
    ///
    /// Incremental tasks pass the stored high-water mark through
    /// `incremental_format` as `{extra_args}` and record a new mark after a
    /// successful real run. `full_refresh` ignores stored state and leaves it
    /// untouched.
    pub fn sync(&self, name: &str, full_refresh: bool) -> Result<TaskRun> {
        let task = self.lookup(TaskKind::Sync, name)?;
        let commands = task_commands(name, task)?;

        let incremental = match (&task.incremental_field, &task.state_file) {
            (Some(field), Some(state_file)) if !full_refresh => {
                Some((field.as_str(), StateTracker::new(expand_path(state_file))))
            }
            _ => None,
        };

        let mut extra_args = String::new();
        let mut tracker = None;
        if let Some((field, mut state)) = incremental {
            match state.get_high_water_mark(name, field) {
                Some(last_value) => {
                    let format = task
                        .incremental_format
                        .as_deref()
                        .unwrap_or(DEFAULT_INCREMENTAL_FORMAT);
                    extra_args = format.replace("{field}", field).replace("{value}", &last_value);
                    info!("Incremental sync since {}={}", field, last_value);
                }
                None => info!("First sync for task '{}' (no previous state)", name),
            }
            tracker = Some((field, state));
        }

        let vars = self.task_variables(task, extra_args)?;
        info!("Executing sync task: {}", name);
        let outputs = self.commands.run_multiple(&commands, &vars)?;

        let mut high_water_mark = None;
        if let Some((field, mut state)) = tracker
            && !self.commands.dry_run
        {
            let mark = utc_timestamp();
            state.set_high_water_mark(name, field, &mark)?;
            info!("Updated {} high-water mark to {}", field, mark);
            high_water_mark = Some(mark);
        }

        Ok(TaskRun {
            kind: TaskKind::Sync,
            name: name.to_string(),
            dry_run: self.commands.dry_run,
            outputs,
            high_water_mark,
        })
    }

    /// Run a process or status task.
    pub fn run_task(&self, kind: TaskKind, name: &str) -> Result<TaskRun> {
        let task = self.lookup(kind, name)?;
        self.execute(kind, name.to_string(), task)
    }

    /// Run `merge.<category>.<task>`, or a flat `merge.<category>` task.
    ///
    /// Naming a category without a task lists the category instead.
    pub fn merge(&self, category: &str, task: Option<&str>) -> Result<MergeOutcome> {
        let entry = self
            .config
            .merge
            .get(category)
            .ok_or_else(|| TaskError::CategoryNotFound(category.to_string()))?;

        match (entry, task) {
            (MergeEntry::Task(config), None) => self
                .execute(TaskKind::Merge, category.to_string(), config)
                .map(MergeOutcome::Ran),
            (MergeEntry::Task(_), Some(_)) => Err(TaskError::NotACategory(category.to_string())),
            (MergeEntry::Category(tasks), None) => Ok(MergeOutcome::Listing(
                tasks.iter().map(|(name, t)| listing(name, t)).collect(),
            )),
            (MergeEntry::Category(tasks), Some(name)) => {
                let config = tasks.get(name).ok_or_else(|| TaskError::MergeTaskNotFound {
                    category: category.to_string(),
                    task: name.to_string(),
                })?;
                self.execute(TaskKind::Merge, format!("{}.{}", category, name), config)
                    .map(MergeOutcome::Ran)
            }
        }
    }

    fn lookup(&self, kind: TaskKind, name: &str) -> Result<&'a TaskConfig> {
        self.config
            .tasks_of(kind)
            .and_then(|tasks| tasks.get(name))
            .ok_or_else(|| TaskError::TaskNotFound {
                kind,
                name: name.to_string(),
            })
    }

    fn execute(&self, kind: TaskKind, name: String, task: &TaskConfig) -> Result<TaskRun> {
        let commands = task_commands(&name, task)?;
        let vars = self.task_variables(task, String::new())?;
        info!("Executing {} task: {}", kind, name);
        let outputs = self.commands.run_multiple(&commands, &vars)?;
        Ok(TaskRun {
            kind,
            name,
            dry_run: self.commands.dry_run,
            outputs,
            high_water_mark: None,
        })
    }

    /// `output`, `workspace`, date range, `extra_args`, then the task's own
    /// `variables`, which override everything before them.
    fn task_variables(&self, task: &TaskConfig, extra_args: String) -> Result<Variables> {
        let mut vars = Variables::new();
        vars.insert(
            "output".to_string(),
            task.output
                .as_deref()
                .map(|o| expand_path(o).display().to_string())
                .unwrap_or_default(),
        );
        vars.insert(
            "workspace".to_string(),
            self.config.workspace_path().display().to_string(),
        );

        if let Some(range) = &task.date_range {
            let (from_date, to_date) = parse_date_range(range)?;
            info!("Date range: {} to {}", from_date, to_date);
            vars.insert("from_date".to_string(), from_date);
            vars.insert("to_date".to_string(), to_date);
        }

        vars.insert("extra_args".to_string(), extra_args);

        for (key, value) in &task.variables {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            vars.insert(key.clone(), value);
        }

        Ok(vars)
    }
}

fn listing(name: &str, task: &TaskConfig) -> TaskListing {
    TaskListing {
        name: name.to_string(),
        description: task.description_or_default().to_string(),
    }
}

fn task_commands<'t>(name: &str, task: &'t TaskConfig) -> Result<Vec<&'t str>> {
    let commands = task.command_list();
    if commands.is_empty() {
        return Err(TaskError::NoCommand(name.to_string()));
    }
    Ok(commands)
}
