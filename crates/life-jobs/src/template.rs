//! Variable substitution for step arguments.
//!
//! Resolves `{name}` placeholders in string values anywhere inside a JSON value
//! tree, against a flat map of string variables.
//!
//! # Template Syntax
//!
//! - `{name}` is replaced by the value of `name`, if supplied
//! - `{name}` with no supplied value is left verbatim and reported as unresolved
//! - `{{text}}` is an escape and renders as the literal `{text}`, provided
//!   `text` itself contains no braces
//! - a lone `{{` or `}}` outside an escape span is left untouched
//!
//! Substitution is a single pass. Text inserted from a variable is never
//! re-scanned, so a value containing `{other}` stays as written.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

/// Variables supplied to a run, e.g. parsed from `--var KEY=VALUE`.
pub type Variables = BTreeMap<String, String>;

// An escape span `{{text}}` or a placeholder `{name}`, where a name is any run
// of non-`}` characters. Escapes are tried first at each position.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^{}]*)\}\}|\{([^}]+)\}").expect("constant regex pattern is valid")
});

/// Output of a substitution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// The value with every known placeholder replaced and escapes restored.
    pub value: Value,
    /// Placeholder names that had no variable, sorted and deduplicated.
    pub unresolved: BTreeSet<String>,
}

impl Rendered {
    /// True when every placeholder was resolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Substitute `vars` into `value`, collecting any placeholders left unresolved.
///
/// Unresolved names are gathered while escapes are still protected, so
/// `{{literal}}` never shows up as a missing variable.
pub fn render(value: &Value, vars: &Variables) -> Rendered {
    let mut unresolved = BTreeSet::new();
    let value = render_value(value, vars, &mut unresolved);
    Rendered { value, unresolved }
}

/// Substitute `vars` into `value`. Unknown placeholders are left as-is.
pub fn substitute(value: &Value, vars: &Variables) -> Value {
    render(value, vars).value
}

/// Substitute `vars` into a single string.
pub fn substitute_str(template: &str, vars: &Variables) -> String {
    render_str(template, vars, &mut BTreeSet::new())
}

/// Substitute `vars` into a single string, returning the names left unresolved.
pub fn render_text(template: &str, vars: &Variables) -> (String, BTreeSet<String>) {
    let mut unresolved = BTreeSet::new();
    let text = render_str(template, vars, &mut unresolved);
    (text, unresolved)
}

/// Collect the names of all `{name}` placeholders in `value`, ignoring `{{escapes}}`.
pub fn find_unresolved(value: &Value) -> BTreeSet<String> {
    render(value, &Variables::new()).unresolved
}

/// Collect placeholder names in a single string, ignoring `{{escapes}}`.
pub fn find_unresolved_str(template: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    render_str(template, &Variables::new(), &mut found);
    found
}

fn render_value(value: &Value, vars: &Variables, unresolved: &mut BTreeSet<String>) -> Value {
    match value {
        Value::String(s) => Value::String(render_str(s, vars, unresolved)),
        Value::Object(map) => {
            let mut rendered = serde_json::Map::new();
            for (k, v) in map {
                rendered.insert(k.clone(), render_value(v, vars, unresolved));
            }
            Value::Object(rendered)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, vars, unresolved))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_str(template: &str, vars: &Variables, unresolved: &mut BTreeSet<String>) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures| {
            if let Some(literal) = caps.get(1) {
                return format!("{{{}}}", literal.as_str());
            }
            let name = &caps[2];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    unresolved.insert(name.to_string());
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_string() {
        let out = substitute_str("Hello {name}!", &vars(&[("name", "World")]));
        assert_eq!(out, "Hello World!");
    }

    #[test]
    fn test_object_values() {
        let out = substitute(
            &json!({"greeting": "Hello {name}!", "path": "{dir}/file.txt"}),
            &vars(&[("name", "User"), ("dir", "/home")]),
        );
        assert_eq!(out, json!({"greeting": "Hello User!", "path": "/home/file.txt"}));
    }

    #[test]
    fn test_array_values() {
        let out = substitute(
            &json!(["{a}", "{b}", "literal"]),
            &vars(&[("a", "first"), ("b", "second")]),
        );
        assert_eq!(out, json!(["first", "second", "literal"]));
    }

    #[test]
    fn test_nested_structures() {
        let out = substitute(&json!({"outer": {"inner": ["{val}"]}}), &vars(&[("val", "nested")]));
        assert_eq!(out, json!({"outer": {"inner": ["nested"]}}));
    }

    #[test]
    fn test_non_string_values_unchanged() {
        let input = json!({"count": 42, "enabled": true, "nothing": null, "ratio": 0.5});
        assert_eq!(substitute(&input, &vars(&[("count", "7")])), input);
    }

    #[test]
    fn test_missing_variable_left_verbatim() {
        let rendered = render(&json!("echo {missing}"), &Variables::new());
        assert_eq!(rendered.value, json!("echo {missing}"));
        assert_eq!(
            rendered.unresolved.into_iter().collect::<Vec<_>>(),
            vec!["missing"]
        );
    }

    #[test]
    fn test_escaped_braces_become_literal() {
        let rendered = render(&json!("filter {{literal}}"), &Variables::new());
        assert_eq!(rendered.value, json!("filter {literal}"));
        assert!(rendered.is_complete());
    }

    #[test]
    fn test_escaped_braces_survive_matching_variable() {
        let out = substitute_str("{{name}} is {name}", &vars(&[("name", "Ada")]));
        assert_eq!(out, "{name} is Ada");
    }

    #[test]
    fn test_odata_filter_with_variable() {
        let out = substitute_str(
            "$filter=contains(fullname,'{who}') and {{statecode}} eq 0",
            &vars(&[("who", "Smith")]),
        );
        assert_eq!(out, "$filter=contains(fullname,'Smith') and {statecode} eq 0");
    }

    #[test]
    fn test_substituted_value_not_rescanned() {
        let rendered = render(
            &json!("{a}"),
            &vars(&[("a", "{b}"), ("b", "injected")]),
        );
        assert_eq!(rendered.value, json!("{b}"));
        assert!(rendered.is_complete());
    }

    #[test]
    fn test_unresolved_sorted_and_deduplicated() {
        let rendered = render(
            &json!({"x": "{zeta} {alpha}", "y": ["{alpha}", {"z": "{mid}"}]}),
            &Variables::new(),
        );
        assert_eq!(
            rendered.unresolved.into_iter().collect::<Vec<_>>(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn test_partial_resolution_reports_only_missing() {
        let rendered = render(&json!("{have} {lack}"), &vars(&[("have", "1")]));
        assert_eq!(rendered.value, json!("1 {lack}"));
        assert_eq!(
            rendered.unresolved.into_iter().collect::<Vec<_>>(),
            vec!["lack"]
        );
    }

    #[test]
    fn test_find_unresolved_ignores_escapes() {
        let found = find_unresolved(&json!({"q": "{{escaped}} {real}"}));
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["real"]);
    }

    #[test]
    fn test_find_unresolved_str() {
        let found = find_unresolved_str("{output} --since {value}");
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["output", "value"]);
    }

    #[test]
    fn test_keys_are_not_substituted() {
        let out = substitute(&json!({"{name}": "x"}), &vars(&[("name", "y")]));
        assert_eq!(out, json!({"{name}": "x"}));
    }

    #[test]
    fn test_nested_brace_literal_is_reported() {
        let input = json!("{\"a\": {\"b\": 1}}");
        let rendered = render(&input, &Variables::new());
        assert_eq!(rendered.value, input);
        assert_eq!(
            rendered.unresolved.into_iter().collect::<Vec<_>>(),
            vec!["\"a\": {\"b\": 1"]
        );
    }

    #[test]
    fn test_lone_double_braces_untouched() {
        let rendered = render(&json!("end }} and {{ start"), &Variables::new());
        assert_eq!(rendered.value, json!("end }} and {{ start"));
        assert!(rendered.is_complete());
    }

    #[test]
    fn test_triple_braces_fail_with_clean_name() {
        let rendered = render(&json!("x {{{name}}} y"), &vars(&[("name", "World")]));
        assert_eq!(rendered.value, json!("x {{{name}}} y"));
        assert_eq!(
            rendered.unresolved.into_iter().collect::<Vec<_>>(),
            vec!["{{name"]
        );
    }

    #[test]
    fn test_empty_escape() {
        assert_eq!(substitute_str("set {{}}", &Variables::new()), "set {}");
    }

    #[test]
    fn test_unclosed_brace_ignored() {
        let rendered = render(&json!("open { but no close"), &Variables::new());
        assert_eq!(rendered.value, json!("open { but no close"));
        assert!(rendered.is_complete());
    }
}
