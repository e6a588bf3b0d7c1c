//! Step function registry.
//!
//! Jobs name their step functions with a dotted `call` path such as
//! `life_jobs.shell.run`. The registry maps those paths to functions and is the
//! only way a job can reach executable code: a path must begin with one of
//! [`ALLOWED_CALL_PREFIXES`] before any lookup happens, and only functions
//! registered under that namespace can be found.
//!
//! # Example
//!
//! ```rust,ignore
//! use life_jobs::{StepRegistry, StepArgs};
//!
//! let mut registry = StepRegistry::builtin();
//! registry.register("life_jobs.notes.touch", |args: &StepArgs| {
//!     Ok(serde_json::json!({"touched": args.len()}))
//! })?;
//!
//! let step = registry.resolve("life_jobs.notes.touch")?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{JobError, Result, StepError};
use crate::steps::{self, StepArgs};

/// Namespaces a job step's `call` may reference.
pub const ALLOWED_CALL_PREFIXES: &[&str] = &["life_jobs."];

/// A callable step function.
pub type StepFn = Arc<dyn Fn(&StepArgs) -> std::result::Result<Value, StepError> + Send + Sync>;

/// Whether `call` is inside the allowed namespace.
pub fn is_allowed(call: &str) -> bool {
    ALLOWED_CALL_PREFIXES
        .iter()
        .any(|prefix| call.starts_with(prefix))
}

/// Split `"module.submodule.function"` into `("module.submodule", "function")`.
pub fn split_call_path(call: &str) -> Option<(&str, &str)> {
    call.rsplit_once('.')
        .filter(|(module, func)| !module.is_empty() && !func.is_empty())
}

fn not_allowed(call: &str) -> JobError {
    JobError::CallNotAllowed {
        call: call.to_string(),
        allowed: ALLOWED_CALL_PREFIXES.iter().map(|p| p.to_string()).collect(),
    }
}

/// Closed mapping from call path to step function.
///
/// Build one per invocation with [`StepRegistry::builtin`] and pass it by
/// reference to the runner.
#[derive(Clone, Default)]
pub struct StepRegistry {
    steps: HashMap<String, StepFn>,
}

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .finish()
    }
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in step function.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (call, func) in steps::BUILTINS {
            registry.steps.insert(call.to_string(), Arc::new(*func));
        }
        registry
    }

    /// Register a step function under `call`.
    ///
    /// Fails with [`JobError::CallNotAllowed`] if `call` is outside the allowed
    /// namespace. An existing entry with the same path is replaced.
    pub fn register<F>(&mut self, call: &str, func: F) -> Result<()>
    where
        F: Fn(&StepArgs) -> std::result::Result<Value, StepError> + Send + Sync + 'static,
    {
        if !is_allowed(call) {
            return Err(not_allowed(call));
        }
        self.steps.insert(call.to_string(), Arc::new(func));
        Ok(())
    }

    /// Resolve `call` to its step function.
    ///
    /// The allow-list is checked before the registry is consulted.
    pub fn resolve(&self, call: &str) -> Result<StepFn> {
        if !is_allowed(call) {
            return Err(not_allowed(call));
        }

        if let Some((module, func)) = split_call_path(call) {
            debug!(module, function = func, "resolving step function");
        }

        self.steps
            .get(call)
            .cloned()
            .ok_or_else(|| JobError::StepNotRegistered {
                call: call.to_string(),
            })
    }

    /// Check if a call path is registered.
    pub fn contains(&self, call: &str) -> bool {
        self.steps.contains_key(call)
    }

    /// All registered call paths, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered step functions.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_contains_shell_run() {
        let registry = StepRegistry::builtin();
        assert!(registry.contains("life_jobs.shell.run"));
        assert!(registry.resolve("life_jobs.shell.run").is_ok());
    }

    #[test]
    fn test_builtins_are_in_allowed_namespace() {
        for (call, _) in steps::BUILTINS {
            assert!(is_allowed(call), "{call} escapes the allowed namespace");
        }
    }

    #[test]
    fn test_resolve_not_allowed() {
        let registry = StepRegistry::builtin();
        let err = registry.resolve("os.system").err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("not allowed"));
        assert!(msg.contains("life_jobs."));
    }

    #[test]
    fn test_resolve_blocks_lookalike_prefix() {
        let registry = StepRegistry::builtin();
        assert!(matches!(
            registry.resolve("life_jobsx.shell.run"),
            Err(JobError::CallNotAllowed { .. })
        ));
        assert!(matches!(
            registry.resolve("subprocess.run"),
            Err(JobError::CallNotAllowed { .. })
        ));
    }

    #[test]
    fn test_resolve_unregistered_in_namespace() {
        let registry = StepRegistry::builtin();
        match registry.resolve("life_jobs.nothing.here") {
            Err(JobError::StepNotRegistered { call }) => assert_eq!(call, "life_jobs.nothing.here"),
            other => panic!("Expected StepNotRegistered, got: {:?}", other.err()),
        }
    }

    #[test]
    fn test_register_outside_namespace_rejected() {
        let mut registry = StepRegistry::new();
        let result = registry.register("std.process.exit", |_| Ok(Value::Null));
        assert!(matches!(result, Err(JobError::CallNotAllowed { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = StepRegistry::new();
        registry
            .register("life_jobs.test.echo", |args: &StepArgs| {
                Ok(Value::Object(args.clone()))
            })
            .unwrap();

        let func = registry.resolve("life_jobs.test.echo").unwrap();
        let mut args = StepArgs::new();
        args.insert("msg".into(), json!("hi"));
        assert_eq!(func(&args).unwrap(), json!({"msg": "hi"}));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = StepRegistry::new();
        registry.register("life_jobs.b.x", |_| Ok(Value::Null)).unwrap();
        registry.register("life_jobs.a.x", |_| Ok(Value::Null)).unwrap();
        assert_eq!(registry.names(), vec!["life_jobs.a.x", "life_jobs.b.x"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_split_call_path() {
        assert_eq!(
            split_call_path("life_jobs.shell.run"),
            Some(("life_jobs.shell", "run"))
        );
        assert_eq!(split_call_path("nodots"), None);
        assert_eq!(split_call_path("life_jobs."), None);
    }
}
