//! Known external tools and availability checks.
//!
//! Task commands shell out to CLI tools (`dataverse`, `msg`, ...). This module
//! works out which tools a config depends on and whether they are on `PATH`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::{LifeConfig, TaskKind};

/// Metadata for a known CLI tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub binary: String,
    pub description: String,
    pub install_hint: String,
}

impl ToolInfo {
    pub fn new(name: &str, description: &str, install_hint: &str) -> Self {
        Self {
            name: name.to_string(),
            binary: name.to_string(),
            description: description.to_string(),
            install_hint: install_hint.to_string(),
        }
    }
}

/// Registry of known tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolInfo>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the tools Life-CLI knows about out of the box.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ToolInfo::new(
            "msg",
            "Microsoft Graph CLI for email, calendar, and contacts",
            "Install from: https://github.com/bmensi/msg-cli",
        ));
        registry.register(ToolInfo::new(
            "gws",
            "Google Workspace CLI for Drive, Sheets, and Docs",
            "Install from: https://github.com/bmensi/gws-cli",
        ));
        registry.register(ToolInfo::new(
            "cal",
            "Calendar sync and management tool",
            "Install from: https://github.com/bmensi/cal-cli",
        ));
        registry.register(ToolInfo::new(
            "dataverse",
            "Microsoft Dataverse CLI for CRM data access",
            "Install from: https://github.com/bmensi/dataverse-cli",
        ));
        registry
    }

    /// Register or replace a tool.
    pub fn register(&mut self, tool: ToolInfo) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&ToolInfo> {
        self.tools.get(name)
    }

    /// All known tools, sorted by name.
    pub fn list(&self) -> impl Iterator<Item = &ToolInfo> {
        self.tools.values()
    }

    /// Whether `name` is on `PATH`. Known tools are looked up by their binary name.
    pub fn is_installed(&self, name: &str) -> bool {
        let binary = self.get(name).map(|t| t.binary.as_str()).unwrap_or(name);
        find_on_path(binary).is_some()
    }
}

/// Locate an executable on `PATH`.
pub fn find_on_path(binary: &str) -> Option<PathBuf> {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(binary);
        return is_executable(&path).then_some(path);
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

const WRAPPER_PREFIXES: &[&str] = &["sudo", "env", "time", "nice", "nohup"];

/// The tool a command invokes: the first word after wrapper prefixes and
/// `VAR=value` assignments, without its directory.
pub fn extract_tools_from_command(command: &str) -> Vec<String> {
    let mut parts = command.split_whitespace().peekable();

    while parts.peek().is_some_and(|p| WRAPPER_PREFIXES.contains(p)) {
        parts.next();
    }
    while parts.peek().is_some_and(|p| p.contains('=')) {
        parts.next();
    }

    let Some(first) = parts.next() else {
        return Vec::new();
    };
    match first.rsplit('/').next() {
        Some(name) if !name.is_empty() => vec![name.to_string()],
        _ => Vec::new(),
    }
}

/// Every tool referenced by any task command.
pub fn extract_tools_from_config(config: &LifeConfig) -> BTreeSet<String> {
    config
        .all_tasks()
        .iter()
        .flat_map(|t| t.task.command_list())
        .flat_map(extract_tools_from_command)
        .collect()
}

/// Availability of one referenced tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCheck {
    pub tool: String,
    pub installed: bool,
    pub message: String,
}

/// Check every tool the config references, sorted by tool name.
pub fn validate_tools(config: &LifeConfig, registry: &ToolRegistry) -> Vec<ToolCheck> {
    extract_tools_from_config(config)
        .into_iter()
        .map(|tool| {
            let installed = registry.is_installed(&tool);
            let message = match (installed, registry.get(&tool)) {
                (true, Some(info)) => format!("✓ {}", info.description),
                (true, None) => "✓ Tool found on PATH".to_string(),
                (false, Some(info)) => format!("✗ Not installed. {}", info.install_hint),
                (false, None) => "✗ Not found on PATH (unknown tool)".to_string(),
            };
            ToolCheck {
                tool,
                installed,
                message,
            }
        })
        .collect()
}

/// One row of a task listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub kind: TaskKind,
    pub name: String,
    pub description: String,
    pub tools: Vec<String>,
    pub incremental: bool,
}

/// Summaries of every task, grouped by category order.
pub fn task_summary(config: &LifeConfig) -> Vec<TaskSummary> {
    config
        .all_tasks()
        .into_iter()
        .map(|t| {
            let tools: BTreeSet<String> = t
                .task
                .command_list()
                .into_iter()
                .flat_map(extract_tools_from_command)
                .collect();
            TaskSummary {
                kind: t.kind,
                name: t.qualified_name(),
                description: t.task.description_or_default().to_string(),
                tools: tools.into_iter().collect(),
                incremental: t.kind == TaskKind::Sync && t.task.incremental_field.is_some(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple() {
        assert_eq!(extract_tools_from_command("msg export --out x"), vec!["msg"]);
    }

    #[test]
    fn test_extract_skips_prefixes_and_assignments() {
        assert_eq!(
            extract_tools_from_command("sudo env TOKEN=abc MODE=x /usr/local/bin/dataverse query"),
            vec!["dataverse"]
        );
        assert_eq!(
            extract_tools_from_command("env TOKEN=abc /opt/bin/gws sheets pull"),
            vec!["gws"]
        );
        assert_eq!(extract_tools_from_command("nohup time cal sync"), vec!["cal"]);
    }

    #[test]
    fn test_extract_empty_and_only_prefixes() {
        assert!(extract_tools_from_command("").is_empty());
        assert!(extract_tools_from_command("   ").is_empty());
        assert!(extract_tools_from_command("sudo env A=1").is_empty());
    }

    #[test]
    fn test_extract_from_config_dedupes() {
        let config = LifeConfig::from_yaml(
            r#"
sync:
  a: {command: msg fetch}
  b: {commands: [msg index, gws pull]}
merge:
  clients:
    combine: {command: jq -s add}
status:
  s: {command: msg status}
"#,
        )
        .unwrap();

        let tools: Vec<String> = extract_tools_from_config(&config).into_iter().collect();
        assert_eq!(tools, vec!["gws", "jq", "msg"]);
    }

    #[test]
    fn test_validate_tools_reports_missing_known_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(ToolInfo {
            name: "ghosttool".into(),
            binary: "life-test-no-such-binary-xyz".into(),
            description: "never installed".into(),
            install_hint: "Install from: nowhere".into(),
        });
        let config = LifeConfig::from_yaml("process:\n  p: {command: ghosttool run}\n").unwrap();

        let checks = validate_tools(&config, &registry);
        assert_eq!(checks.len(), 1);
        assert!(!checks[0].installed);
        assert_eq!(checks[0].message, "✗ Not installed. Install from: nowhere");
    }

    #[test]
    fn test_validate_tools_finds_sh() {
        let config = LifeConfig::from_yaml("status:\n  s: {command: sh -c true}\n").unwrap();
        let checks = validate_tools(&config, &ToolRegistry::builtin());
        assert_eq!(checks.len(), 1);
        assert!(checks[0].installed);
        assert_eq!(checks[0].message, "✓ Tool found on PATH");
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ToolRegistry::builtin();
        let names: Vec<&str> = registry.list().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["cal", "dataverse", "gws", "msg"]);
        assert!(registry.get("dataverse").unwrap().description.contains("Dataverse"));
    }

    #[test]
    fn test_unknown_tool_not_on_path() {
        let registry = ToolRegistry::builtin();
        assert!(!registry.is_installed("life-test-no-such-binary-xyz"));
    }

    #[test]
    fn test_task_summary() {
        let config = LifeConfig::from_yaml(
            r#"
sync:
  contacts:
    description: Pull contacts
    command: dataverse export
    incremental_field: modifiedon
    state_file: /tmp/s.json
process:
  digest: {command: summarize all}
"#,
        )
        .unwrap();

        let summary = task_summary(&config);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].kind, TaskKind::Sync);
        assert_eq!(summary[0].tools, vec!["dataverse"]);
        assert!(summary[0].incremental);
        assert_eq!(summary[1].description, "No description");
        assert!(!summary[1].incremental);
    }
}
