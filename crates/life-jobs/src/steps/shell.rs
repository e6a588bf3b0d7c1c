//! `life_jobs.shell.run`: execute a shell command.
//!
//! ```yaml
//! - name: export
//!   call: life_jobs.shell.run
//!   args:
//!     command: "msg export --output {out}"
//!     variables:
//!       out: ~/exports/messages.json
//!     timeout: 60
//!     check: true
//! ```

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use super::{ArgsExt, StepArgs};
use crate::error::StepError;

/// Default command timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const KNOWN_ARGS: &[&str] = &["command", "variables", "timeout", "check", "cwd"];

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOutput {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Step function for `life_jobs.shell.run`.
///
/// Arguments:
/// - `command` (required): run through `sh -c`
/// - `variables`: `{key}` replacements applied to `command`, with `~/` expanded
/// - `timeout`: seconds, default 300
/// - `check`: fail on non-zero exit, default true
/// - `cwd`: working directory
pub fn run(args: &StepArgs) -> Result<Value, StepError> {
    args.reject_unknown(KNOWN_ARGS)?;

    let mut command = args.required_str("command")?.to_string();
    let timeout = args.optional_u64("timeout", DEFAULT_TIMEOUT_SECS)?;
    let check = args.optional_bool("check", true)?;
    let cwd = args.optional_str("cwd")?.map(expand_home);

    match args.get("variables") {
        None | Some(Value::Null) => {}
        Some(Value::Object(vars)) => {
            for (key, value) in vars {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let expanded = expand_home(&raw);
                command = command.replace(&format!("{{{}}}", key), &expanded.to_string_lossy());
            }
        }
        Some(_) => return Err(StepError::invalid_arg("variables", "expected a mapping")),
    }

    let output = execute(&command, cwd.as_deref(), Some(Duration::from_secs(timeout)))?;

    if check && !output.success() {
        return Err(StepError::CommandFailed {
            command,
            code: output.returncode,
            stderr: output.stderr,
        });
    }

    serde_json::to_value(&output).map_err(|e| StepError::Other(e.to_string()))
}

/// Run `command` through `sh -c`, capturing stdout and stderr.
///
/// Blocks the calling thread on a single-threaded runtime. The child is killed
/// if `timeout` elapses; `None` waits indefinitely.
pub fn execute(
    command: &str,
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<ShellOutput, StepError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(execute_async(command, cwd, timeout))
}

async fn execute_async(
    command: &str,
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<ShellOutput, StepError> {
    debug!(command, ?cwd, ?timeout, "executing shell command");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| StepError::Timeout {
                command: command.to_string(),
                secs: limit.as_secs(),
            })??,
        None => cmd.output().await?,
    };

    Ok(ShellOutput {
        returncode: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
