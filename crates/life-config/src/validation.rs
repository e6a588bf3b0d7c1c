//! Structural checks over the raw YAML document.
//!
//! These run before typed deserialization and only produce warnings, so a
//! config with a typo still loads.

use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Valid top-level keys.
pub const VALID_TOP_LEVEL_KEYS: &[&str] = &["jobs", "merge", "process", "status", "sync", "workspace"];

/// Categories that hold tasks.
pub const TASK_CATEGORIES: &[&str] = &["sync", "merge", "process", "status"];

/// Fields a task may carry.
pub const TASK_FIELDS: &[&str] = &[
    "append_template",
    "command",
    "commands",
    "date_range",
    "description",
    "id_field",
    "incremental_field",
    "incremental_format",
    "mode",
    "output",
    "state_file",
    "variables",
];

/// Validate the raw config document, returning human-readable issues.
pub fn validate_config(raw: &Value) -> Vec<String> {
    let mut issues = Vec::new();

    let root = match raw {
        Value::Null => return issues,
        Value::Mapping(map) => map,
        other => {
            issues.push(format!(
                "Config must be a mapping at the top level, got {}",
                type_name(other)
            ));
            return issues;
        }
    };

    let mut unknown: Vec<String> = root
        .keys()
        .map(key_name)
        .filter(|k| !VALID_TOP_LEVEL_KEYS.contains(&k.as_str()))
        .collect();
    unknown.sort();
    if !unknown.is_empty() {
        let described: Vec<String> = unknown
            .iter()
            .map(|k| match suggest_fix(k, VALID_TOP_LEVEL_KEYS) {
                Some(fix) => format!("{} (did you mean '{}'?)", k, fix),
                None => k.clone(),
            })
            .collect();
        issues.push(format!(
            "Unknown top-level config keys: {}. Valid keys are: {}",
            described.join(", "),
            VALID_TOP_LEVEL_KEYS.join(", ")
        ));
    }

    for category in TASK_CATEGORIES {
        let Some(section) = root.get(*category) else {
            continue;
        };

        let tasks = match section {
            Value::Mapping(tasks) => tasks,
            Value::Null => continue,
            other => {
                issues.push(format!(
                    "'{}' must be a dictionary, got {}",
                    category,
                    type_name(other)
                ));
                continue;
            }
        };

        for (name, task) in tasks {
            let path = format!("{}.{}", category, key_name(name));
            let Value::Mapping(task) = task else {
                issues.push(format!(
                    "{}: Task config must be a dictionary, got {}",
                    path,
                    type_name(task)
                ));
                continue;
            };

            if *category == "merge" && is_nested_category(task) {
                for (sub_name, sub_task) in task {
                    if let Value::Mapping(sub_task) = sub_task {
                        let sub_path = format!("{}.{}", path, key_name(sub_name));
                        issues.extend(validate_task(&sub_path, sub_task));
                    }
                }
            } else {
                issues.extend(validate_task(&path, task));
            }
        }
    }

    issues
}

/// A merge entry is a category when every value is itself a mapping.
fn is_nested_category(entry: &Mapping) -> bool {
    !entry.is_empty() && entry.values().all(|v| v.is_mapping())
}

fn validate_task(path: &str, task: &Mapping) -> Vec<String> {
    let mut issues = Vec::new();

    let has_command = task.contains_key("command");
    let has_commands = task.contains_key("commands");

    if !has_command && !has_commands {
        issues.push(format!("{}: Missing required field 'command' or 'commands'", path));
    } else if has_command && has_commands {
        issues.push(format!("{}: Cannot have both 'command' and 'commands' fields", path));
    }

    if let Some(commands) = task.get("commands")
        && !commands.is_sequence()
    {
        issues.push(format!(
            "{}: 'commands' must be a list, got {}",
            path,
            type_name(commands)
        ));
    }

    let is_set = |key: &str| task.get(key).is_some_and(|v| !v.is_null());
    let incremental_field = is_set("incremental_field");
    let state_file = is_set("state_file");
    if incremental_field && !state_file {
        issues.push(format!("{}: 'incremental_field' requires 'state_file' to be set", path));
    }
    if state_file && !incremental_field {
        issues.push(format!("{}: 'state_file' requires 'incremental_field' to be set", path));
    }

    let mut unrecognized: Vec<String> = task
        .keys()
        .map(key_name)
        .filter(|k| !TASK_FIELDS.contains(&k.as_str()))
        .collect();
    if !unrecognized.is_empty() {
        unrecognized.sort();
        debug!(
            "{}: Unrecognized fields: {}. These will be ignored unless added to 'variables' dictionary.",
            path,
            unrecognized.join(", ")
        );
    }

    issues
}

/// Suggest the closest valid option for a typo.
///
/// Returns the option with the smallest case-insensitive edit distance, if
/// that distance is at most 2.
pub fn suggest_fix<'a>(typo: &str, options: &[&'a str]) -> Option<&'a str> {
    let typo = typo.to_lowercase();
    let mut best: Option<(&'a str, usize)> = None;

    for &option in options {
        let distance = levenshtein(&typo, &option.to_lowercase());
        if distance <= 2 && best.is_none_or(|(_, d)| distance < d) {
            best = Some((option, distance));
        }
    }

    best.map(|(option, _)| option)
}

/// Edit distance between two strings.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut row = Vec::with_capacity(b.len() + 1);
        row.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { prev[j] } else { 1 + prev[j].min(prev[j + 1]).min(row[j]) };
            row.push(cost);
        }
        prev = row;
    }

    prev[b.len()]
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dictionary",
        Value::Tagged(_) => "tagged value",
    }
}
