//! Built-in step functions.
//!
//! Every step function takes its substituted `args` mapping and returns a JSON
//! result that the runner records in the step outcome.

pub mod shell;

use serde_json::Value;

use crate::error::StepError;

/// Keyword arguments passed to a step function.
pub type StepArgs = serde_json::Map<String, Value>;

/// Signature shared by built-in step functions.
pub type BuiltinStep = fn(&StepArgs) -> Result<Value, StepError>;

/// The fixed set of step functions shipped with the runner.
pub const BUILTINS: &[(&str, BuiltinStep)] = &[("life_jobs.shell.run", shell::run)];

/// Typed accessors over [`StepArgs`].
///
/// Values arrive from YAML after string substitution, so numbers and booleans
/// may be written either natively or as strings (`timeout: "60"`).
pub trait ArgsExt {
    /// Get a required string argument.
    fn required_str(&self, name: &'static str) -> Result<&str, StepError>;

    /// Get an optional string argument.
    fn optional_str(&self, name: &str) -> Result<Option<&str>, StepError>;

    /// Get an optional u64 argument with default.
    fn optional_u64(&self, name: &str, default: u64) -> Result<u64, StepError>;

    /// Get an optional boolean argument with default.
    fn optional_bool(&self, name: &str, default: bool) -> Result<bool, StepError>;

    /// Reject any argument not in `known`.
    fn reject_unknown(&self, known: &[&str]) -> Result<(), StepError>;
}

impl ArgsExt for StepArgs {
    fn required_str(&self, name: &'static str) -> Result<&str, StepError> {
        match self.get(name) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(StepError::invalid_arg(name, "expected a string")),
            None => Err(StepError::invalid_arg(name, "missing required argument")),
        }
    }

    fn optional_str(&self, name: &str) -> Result<Option<&str>, StepError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(StepError::invalid_arg(name, "expected a string")),
        }
    }

    fn optional_u64(&self, name: &str, default: u64) -> Result<u64, StepError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_u64()
                .ok_or_else(|| StepError::invalid_arg(name, "expected a non-negative integer")),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| StepError::invalid_arg(name, format!("'{}' is not an integer", s))),
            Some(_) => Err(StepError::invalid_arg(name, "expected an integer")),
        }
    }

    fn optional_bool(&self, name: &str, default: bool) -> Result<bool, StepError> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(StepError::invalid_arg(name, format!("'{}' is not a boolean", s))),
            },
            Some(_) => Err(StepError::invalid_arg(name, "expected a boolean")),
        }
    }

    fn reject_unknown(&self, known: &[&str]) -> Result<(), StepError> {
        match self.keys().find(|k| !known.contains(&k.as_str())) {
            Some(unknown) => Err(StepError::invalid_arg(
                unknown.clone(),
                "unexpected argument",
            )),
            None => Ok(()),
        }
    }
}
