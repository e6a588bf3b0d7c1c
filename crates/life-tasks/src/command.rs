//! Shell command execution for config tasks.

use life_jobs::steps::shell::{self, ShellOutput};
use life_jobs::template;
use life_jobs::{StepError, Variables};
use tracing::{debug, error, info, warn};

use crate::error::Result;

const LOG_COMMAND_CHARS: usize = 100;

/// Runs task commands with `{variable}` substitution.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner {
    pub dry_run: bool,
    pub verbose: bool,
}

impl CommandRunner {
    pub fn new(dry_run: bool, verbose: bool) -> Self {
        Self { dry_run, verbose }
    }

    /// Substitute `vars` into `command`. `{{text}}` renders as `{text}`.
    ///
    /// Unknown placeholders are left in place and logged.
    pub fn substitute_variables(&self, command: &str, vars: &Variables) -> String {
        let (rendered, unresolved) = template::render_text(command, vars);
        if !unresolved.is_empty() {
            let names: Vec<&str> = unresolved.iter().map(String::as_str).collect();
            warn!("Unsubstituted variables: {:?}", names);
        }
        rendered
    }

    /// Run one command. Returns `None` in dry-run mode.
    ///
    /// A non-zero exit is an error carrying the exit code and stderr.
    pub fn run(&self, command: &str, vars: &Variables) -> Result<Option<ShellOutput>> {
        let final_command = self.substitute_variables(command, vars);

        if self.dry_run {
            info!("[DRY RUN] Would execute:");
            info!("  {}", final_command);
            return Ok(None);
        }

        info!("Executing: {}", truncate(&final_command, LOG_COMMAND_CHARS));
        let output = shell::execute(&final_command, None, None)?;

        if !output.success() {
            error!("Command failed with exit code {}", output.returncode);
            if !output.stdout.is_empty() {
                error!("STDOUT:\n{}", output.stdout);
            }
            if !output.stderr.is_empty() {
                error!("STDERR:\n{}", output.stderr);
            }
            return Err(StepError::CommandFailed {
                command: final_command,
                code: output.returncode,
                stderr: output.stderr,
            }
            .into());
        }

        if self.verbose && !output.stdout.is_empty() {
            debug!("STDOUT:\n{}", output.stdout);
        }
        if !output.stderr.is_empty() {
            warn!("STDERR:\n{}", output.stderr);
        }

        Ok(Some(output))
    }

    /// Run commands in order, stopping at the first failure.
    pub fn run_multiple(
        &self,
        commands: &[&str],
        vars: &Variables,
    ) -> Result<Vec<Option<ShellOutput>>> {
        let mut results = Vec::with_capacity(commands.len());
        for (i, command) in commands.iter().enumerate() {
            info!("Command {}/{}", i + 1, commands.len());
            results.push(self.run(command, vars)?);
        }
        Ok(results)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
