//! Task registry: recorded results keyed by task id.
//!
//! Append-only per key and single-writer by construction: only the
//! currently executing task's completion writes its own key, so plain
//! single-threaded sequencing is the whole locking discipline.

use std::collections::HashMap;

use crate::task::TaskResult;

/// Mapping from task id to its recorded result.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    results: HashMap<String, TaskResult>,
}

impl TaskRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a task's result under its id.
    ///
    /// Overwriting an existing key only happens when a task is re-executed,
    /// which the normal flow never does; it is logged loudly.
    pub fn record(&mut self, task_id: &str, result: TaskResult) {
        if self.results.contains_key(task_id) {
            log::warn!("overwriting previously recorded result for task {}", task_id);
        }
        self.results.insert(task_id.to_string(), result);
    }

    /// Look up the recorded result for a task id.
    pub fn get(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    /// Number of recorded results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no result has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Assemble the dependency context for a task: the subset of recorded
    /// outputs restricted to `needs`.
    ///
    /// References to ids not yet recorded are silently dropped; that is a
    /// degraded-context condition, not an error.
    pub fn context_for(&self, needs: &[String]) -> HashMap<String, String> {
        let mut context = HashMap::new();
        for id in needs {
            match self.results.get(id) {
                Some(result) => {
                    context.insert(id.clone(), result.output.clone());
                }
                None => {
                    log::warn!("dependency {} not found in registry, proceeding with degraded context", id);
                }
            }
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(output: &str) -> TaskResult {
        TaskResult {
            output: output.to_string(),
            success: true,
        }
    }

    #[test]
    fn test_record_and_get() {
        let mut registry = TaskRegistry::new();
        assert!(registry.is_empty());
        registry.record("1", result("R1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("1").unwrap().output, "R1");
        assert!(registry.get("2").is_none());
    }

    #[test]
    fn test_context_for_subset() {
        let mut registry = TaskRegistry::new();
        registry.record("1", result("R1"));
        registry.record("2", result("R2"));

        let context = registry.context_for(&["1".to_string()]);
        assert_eq!(context.len(), 1);
        assert_eq!(context["1"], "R1");
    }

    #[test]
    fn test_context_for_missing_dependency_is_empty_not_error() {
        let mut registry = TaskRegistry::new();
        registry.record("1", result("R1"));

        let context = registry.context_for(&["99".to_string()]);
        assert!(context.is_empty());
    }
}
