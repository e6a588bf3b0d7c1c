//! End-to-end job runs against job directories and event logs on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use life_jobs::{
    EventKind, EventLog, JobError, JobRunner, JobStore, RunOptions, StepError, StepRegistry,
    StepStatus, Variables, load_jobs, run_job,
};
use serde_json::{Value, json};
use tempfile::TempDir;

const GREET_JOB: &str = r#"
jobs:
  greet_user:
    description: Greet someone
    steps:
      - name: greet
        call: shell.run
        args:
          command: "echo Hello {name}!"
"#;

struct Workspace {
    _dir: TempDir,
    jobs_dir: PathBuf,
    event_log: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let jobs_dir = dir.path().join("jobs");
        fs::create_dir_all(&jobs_dir).unwrap();
        let event_log = dir.path().join("logs").join("events.jsonl");
        Self {
            _dir: dir,
            jobs_dir,
            event_log,
        }
    }

    fn write_job(&self, file: &str, content: &str) {
        fs::write(self.jobs_dir.join(file), content).unwrap();
    }

    fn options(&self, dry_run: bool, vars: &[(&str, &str)]) -> RunOptions {
        RunOptions {
            dry_run,
            jobs_dir: self.jobs_dir.clone(),
            event_log: self.event_log.clone(),
            variables: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn event_lines(&self) -> Vec<Value> {
        read_lines(&self.event_log)
    }
}

fn read_lines(path: &Path) -> Vec<Value> {
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Registry with a counting step that records every invocation.
fn counting_registry(calls: Arc<AtomicUsize>) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry
        .register("life_jobs.test.count", move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Object(args.clone()))
        })
        .unwrap();
    registry
        .register("life_jobs.test.panic", |_| {
            panic!("step function must not be invoked");
        })
        .unwrap();
    registry
}

#[test]
fn test_greet_user_dry_run() {
    let ws = Workspace::new();
    ws.write_job("greet.yaml", GREET_JOB);

    let result = run_job("greet_user", &ws.options(true, &[("name", "World")])).unwrap();

    assert!(result.run_id.starts_with("greet_user-"));
    assert_eq!(result.steps.len(), 1);
    let step = &result.steps[0];
    assert_eq!(step.name, "greet");
    assert_eq!(step.call, "shell.run");
    assert_eq!(step.status, StepStatus::Skipped);
    assert_eq!(step.args, Some(json!({"command": "echo Hello World!"})));

    let kinds: Vec<String> = ws
        .event_lines()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["job.started", "job.completed"]);
}

#[test]
fn test_greet_user_missing_variable() {
    let ws = Workspace::new();
    ws.write_job("greet.yaml", GREET_JOB);

    let err = run_job("greet_user", &ws.options(true, &[])).unwrap_err();

    assert!(matches!(err, JobError::UnsubstitutedVariables { .. }));
    let msg = err.to_string();
    assert!(msg.contains("name"));
    assert!(msg.contains("greet"));

    let events = ws.event_lines();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1]["event_type"], "job.failed");
    assert_eq!(events[1]["error_message"], msg);
}

#[test]
fn test_invalid_yaml_enumerates_the_file() {
    let ws = Workspace::new();
    ws.write_job("good.yaml", GREET_JOB);
    ws.write_job("broken.yaml", "jobs:\n  bad: [unclosed\n");

    let err = load_jobs(&ws.jobs_dir).unwrap_err();
    match err {
        JobError::Load(load) => {
            assert_eq!(load.errors.len(), 1);
            assert!(load.errors[0].0.ends_with("broken.yaml"));
            assert!(!load.errors[0].1.is_empty());
        }
        other => panic!("Expected Load error, got: {other:?}"),
    }
}

#[test]
fn test_load_error_stops_run_before_logging() {
    let ws = Workspace::new();
    ws.write_job("good.yaml", GREET_JOB);
    ws.write_job("broken.yaml", "jobs: {unclosed\n");

    let err = run_job("greet_user", &ws.options(true, &[("name", "x")])).unwrap_err();
    assert!(err.to_string().contains("broken.yaml"));
    assert!(!ws.event_log.exists());
}

#[test]
fn test_event_log_has_n_times_two_plus_s_lines() {
    let ws = Workspace::new();
    ws.write_job(
        "three.yaml",
        r#"
jobs:
  three:
    steps:
      - {name: a, call: life_jobs.shell.run, args: {command: "true"}}
      - {name: b, call: life_jobs.shell.run, args: {command: "echo {word}"}}
      - {name: c, call: life_jobs.shell.run, args: {command: "printf ok"}}
"#,
    );

    let runs = 2;
    let mut run_ids = Vec::new();
    for _ in 0..runs {
        let result = run_job("three", &ws.options(false, &[("word", "hi")])).unwrap();
        assert_eq!(result.steps[1].result.as_ref().unwrap()["stdout"], "hi\n");
        run_ids.push(result.run_id);
    }

    let events = ws.event_lines();
    assert_eq!(events.len(), runs * (2 + 3));

    let expected = [
        "job.started",
        "step.completed",
        "step.completed",
        "step.completed",
        "job.completed",
    ];
    for (run, chunk) in events.chunks(5).enumerate() {
        let kinds: Vec<&str> = chunk
            .iter()
            .map(|e| e["event_type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, expected);
        assert!(chunk.iter().all(|e| e["correlation_id"] == run_ids[run].as_str()));
    }
    assert_eq!(events[0]["payload"], json!({"job_id": "three", "dry_run": false}));
    assert_eq!(events[1]["payload"], json!({"step": "a", "call": "life_jobs.shell.run"}));
}

#[test]
fn test_dry_run_never_invokes_step_functions() {
    let ws = Workspace::new();
    ws.write_job(
        "dry.yaml",
        r#"
jobs:
  dangerous:
    steps:
      - {name: first, call: life_jobs.test.panic, args: {x: "{v}"}}
      - {name: second, call: life_jobs.test.count}
      - {name: third, call: os.system}
"#,
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(calls.clone());
    let log = EventLog::new(&ws.event_log);
    let vars: Variables = [("v".to_string(), "1".to_string())].into();

    let result = JobRunner::new(&registry, &log)
        .execute(&JobStore::new(&ws.jobs_dir), "dangerous", true, &vars)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(result.steps.len(), 3);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Skipped));

    let kinds: Vec<EventKind> = log.read_all().unwrap().iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![EventKind::JobStarted, EventKind::JobCompleted]);
}

#[test]
fn test_earlier_steps_run_before_later_missing_variable() {
    let ws = Workspace::new();
    ws.write_job(
        "partial.yaml",
        r#"
jobs:
  partial:
    steps:
      - {name: one, call: life_jobs.test.count}
      - {name: two, call: life_jobs.test.count}
      - {name: three, call: life_jobs.test.count, args: {target: "{missing}"}}
      - {name: four, call: life_jobs.test.count}
"#,
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(calls.clone());
    let log = EventLog::new(&ws.event_log);

    let err = JobRunner::new(&registry, &log)
        .execute(&JobStore::new(&ws.jobs_dir), "partial", false, &Variables::new())
        .unwrap_err();

    match err {
        JobError::UnsubstitutedVariables { step, names } => {
            assert_eq!(step, "three");
            assert_eq!(names, vec!["missing"]);
        }
        other => panic!("Expected UnsubstitutedVariables, got: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let kinds: Vec<EventKind> = log.read_all().unwrap().iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::JobStarted,
            EventKind::StepCompleted,
            EventKind::StepCompleted,
            EventKind::JobFailed,
        ]
    );
}

#[test]
fn test_call_not_allowed_in_live_run() {
    let ws = Workspace::new();
    ws.write_job(
        "evil.yaml",
        "jobs:\n  evil:\n    steps:\n      - name: sys\n        call: subprocess.run\n",
    );

    let err = run_job("evil", &ws.options(false, &[])).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("not allowed"));
    assert!(msg.contains("life_jobs."));

    let events = ws.event_lines();
    assert_eq!(events.last().unwrap()["event_type"], "job.failed");
}

#[test]
fn test_step_failure_propagates() {
    let ws = Workspace::new();
    ws.write_job(
        "fail.yaml",
        "jobs:\n  fail:\n    steps:\n      - name: exit\n        call: life_jobs.shell.run\n        args:\n          command: exit 4\n",
    );

    let err = run_job("fail", &ws.options(false, &[])).unwrap_err();
    assert!(matches!(
        err,
        JobError::Step(StepError::CommandFailed { code: 4, .. })
    ));
}

#[test]
fn test_job_not_found_lists_available_ids() {
    let ws = Workspace::new();
    ws.write_job("greet.yaml", GREET_JOB);

    let err = run_job("nope", &ws.options(false, &[])).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Job not found: nope"));
    assert!(msg.contains("greet_user"));
    assert!(!ws.event_log.exists());
}

#[test]
fn test_loading_is_idempotent() {
    let ws = Workspace::new();
    ws.write_job("a.yaml", GREET_JOB);
    ws.write_job(
        "b.yaml",
        "jobs:\n  other:\n    steps:\n      - {call: life_jobs.shell.run, args: {command: ls, timeout: 5}}\n",
    );

    assert_eq!(load_jobs(&ws.jobs_dir).unwrap(), load_jobs(&ws.jobs_dir).unwrap());
}

#[test]
fn test_last_file_wins_on_duplicate_id() {
    let ws = Workspace::new();
    ws.write_job("a.yaml", "jobs:\n  dup:\n    description: from a\n");
    ws.write_job("b.yaml", "jobs:\n  dup:\n    description: from b\n");

    let jobs = load_jobs(&ws.jobs_dir).unwrap();
    assert_eq!(jobs["dup"].description, "from b");
}
