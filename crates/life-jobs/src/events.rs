//! Append-only JSONL event log.
//!
//! Every job run writes a `job.started` line, one `step.completed` line per
//! executed step, and a closing `job.completed` or `job.failed` line. All lines
//! of one run share the run id as `correlation_id`.
//!
//! The file is opened in append mode for each event and never rewritten, so
//! independent processes can share a log.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{JobError, Result};

/// The closed vocabulary of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "job.started")]
    JobStarted,
    #[serde(rename = "step.completed")]
    StepCompleted,
    #[serde(rename = "job.completed")]
    JobCompleted,
    #[serde(rename = "job.failed")]
    JobFailed,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::JobStarted,
        EventKind::StepCompleted,
        EventKind::JobCompleted,
        EventKind::JobFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JobStarted => "job.started",
            EventKind::StepCompleted => "step.completed",
            EventKind::JobCompleted => "job.completed",
            EventKind::JobFailed => "job.failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| JobError::UnknownEventType {
                given: s.to_string(),
                allowed: EventKind::ALL.iter().map(|k| k.as_str()).collect(),
            })
    }
}

/// One line of the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub event_type: EventKind,
    pub correlation_id: String,
    pub status: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Event {
    /// Create an event stamped with the current UTC time.
    pub fn new(
        event_type: EventKind,
        correlation_id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            correlation_id: correlation_id.into(),
            status: status.into(),
            payload: Map::new(),
            error_message: None,
        }
    }

    /// Attach a payload. Non-object values are stored under `"value"`.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self
    }

    /// Attach an error message.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Destination for run events.
pub trait EventSink {
    /// Append a single event.
    fn append(&self, event: &Event) -> Result<()>;
}

/// JSONL event log on disk.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `event_type` and append one event.
    ///
    /// Fails with [`JobError::UnknownEventType`] for anything outside
    /// [`EventKind::ALL`].
    pub fn log_event(
        &self,
        event_type: &str,
        correlation_id: &str,
        status: &str,
        payload: Option<Value>,
        error_message: Option<&str>,
    ) -> Result<Event> {
        let kind: EventKind = event_type.parse()?;
        let mut event = Event::new(kind, correlation_id, status);
        if let Some(payload) = payload {
            event = event.with_payload(payload);
        }
        if let Some(message) = error_message {
            event = event.with_error(message);
        }
        self.append(&event)?;
        Ok(event)
    }

    /// Read every event in the log. A missing file yields an empty list.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(&line)?);
        }
        Ok(events)
    }
}

impl EventSink for EventLog {
    fn append(&self, event: &Event) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// In-memory sink, useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events appended so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Event types in append order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(|e| e.event_type).collect()
    }
}

impl EventSink for MemorySink {
    fn append(&self, event: &Event) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_log() -> (tempfile::TempDir, EventLog) {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path().join("logs").join("events.jsonl"));
        (dir, log)
    }

    #[test]
    fn test_log_event_creates_parent_and_appends() {
        let (_dir, log) = temp_log();

        log.log_event("job.started", "run-1", "success", Some(json!({"job_id": "a"})), None)
            .unwrap();
        log.log_event("job.completed", "run-1", "success", None, None)
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.ends_with('\n'));

        let events = log.read_all().unwrap();
        assert_eq!(events[0].event_type, EventKind::JobStarted);
        assert_eq!(events[0].payload["job_id"], "a");
        assert_eq!(events[1].event_type, EventKind::JobCompleted);
        assert!(events[1].payload.is_empty());
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let (_dir, log) = temp_log();
        let err = log
            .log_event("job.paused", "run-1", "success", None, None)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("job.paused"));
        for kind in EventKind::ALL {
            assert!(msg.contains(kind.as_str()));
        }
        assert!(!log.path().exists());
    }

    #[test]
    fn test_line_fields() {
        let (_dir, log) = temp_log();
        log.log_event("job.failed", "run-9", "failed", Some(json!({"job_id": "x"})), Some("boom"))
            .unwrap();

        let line = fs::read_to_string(log.path()).unwrap();
        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["event_type"], "job.failed");
        assert_eq!(value["correlation_id"], "run-9");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error_message"], "boom");
        assert!(value["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_error_message_omitted_when_absent() {
        let (_dir, log) = temp_log();
        log.log_event("job.started", "run-1", "success", None, None)
            .unwrap();
        let line = fs::read_to_string(log.path()).unwrap();
        assert!(!line.contains("error_message"));
        assert!(line.contains("\"payload\":{}"));
    }

    #[test]
    fn test_existing_content_preserved() {
        let (_dir, log) = temp_log();
        fs::create_dir_all(log.path().parent().unwrap()).unwrap();
        fs::write(log.path(), "{\"earlier\":true}\n").unwrap();

        log.log_event("job.started", "run-2", "success", None, None)
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.starts_with("{\"earlier\":true}\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_event_kind_round_trip_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.append(&Event::new(EventKind::JobStarted, "r", "success"))
            .unwrap();
        sink.append(&Event::new(EventKind::JobFailed, "r", "failed").with_error("x"))
            .unwrap();
        assert_eq!(sink.kinds(), vec![EventKind::JobStarted, EventKind::JobFailed]);
        assert_eq!(sink.events()[1].error_message.as_deref(), Some("x"));
    }
}
