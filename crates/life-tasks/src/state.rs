//! Incremental sync state.
//!
//! Tracks high-water marks per task in a single JSON file:
//!
//! ```json
//! {
//!   "contacts": {
//!     "modifiedon": "2025-11-10T10:30:00.000000Z",
//!     "last_run": "2025-11-10T10:35:00.000000Z"
//!   }
//! }
//! ```
//!
//! The file is read on first access and rewritten in full on every change.
//! There is no locking: concurrent writers to the same file can lose updates.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Reserved per-task field stamped on every update.
pub const LAST_RUN_FIELD: &str = "last_run";

/// Task name to field name to value.
pub type State = BTreeMap<String, BTreeMap<String, String>>;

/// Current UTC time as ISO-8601 with microseconds and a `Z` suffix.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// File-backed high-water mark store.
#[derive(Debug)]
pub struct StateTracker {
    path: PathBuf,
    state: Option<State>,
}

impl StateTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&mut self) -> &mut State {
        let path = &self.path;
        self.state.get_or_insert_with(|| load_state(path))
    }

    /// Stored value of `field` for `task`, if any.
    pub fn get_high_water_mark(&mut self, task: &str, field: &str) -> Option<String> {
        self.state().get(task).and_then(|t| t.get(field)).cloned()
    }

    /// Store `value` for `task.field`, stamp `last_run`, and write the file.
    pub fn set_high_water_mark(&mut self, task: &str, field: &str, value: &str) -> Result<()> {
        let now = utc_timestamp();
        let entry = self.state().entry(task.to_string()).or_default();
        entry.insert(field.to_string(), value.to_string());
        entry.insert(LAST_RUN_FIELD.to_string(), now);
        self.save()?;
        debug!(task, field, value, "updated high-water mark");
        Ok(())
    }

    /// Timestamp of the last update for `task`.
    pub fn last_run(&mut self, task: &str) -> Option<String> {
        self.get_high_water_mark(task, LAST_RUN_FIELD)
    }

    /// Remove all state for `task`. Returns whether anything was removed.
    pub fn clear_task(&mut self, task: &str) -> Result<bool> {
        if self.state().remove(task).is_none() {
            return Ok(false);
        }
        self.save()?;
        info!(task, "cleared state");
        Ok(true)
    }

    /// Snapshot of the full state.
    pub fn all(&mut self) -> State {
        self.state().clone()
    }

    fn save(&mut self) -> Result<()> {
        let content = serde_json::to_string_pretty(self.state())?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "saved state");
        Ok(())
    }
}

fn load_state(path: &Path) -> State {
    if !path.exists() {
        debug!(path = %path.display(), "state file not found, starting empty");
        return State::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read state file, starting empty");
            return State::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(state) => {
            debug!(path = %path.display(), "loaded state");
            state
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid state file, starting empty");
            State::new()
        }
    }
}
