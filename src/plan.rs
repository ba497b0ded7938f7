//! Versioned ordered task sequence for one goal-execution attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::task::PlannedTask;

/// An ordered sequence of tasks representing one execution attempt.
///
/// A plan is superseded, never mutated in place: the revision controller
/// produces a new `Plan` (same `id`, bumped `revision`) whenever the oracle
/// rewrites the remaining tasks. Already-recorded task results live in the
/// registry and survive any number of supersessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Identity of the goal-execution attempt, stable across revisions.
    pub id: Uuid,
    /// Revision counter; 0 is the initial plan.
    pub revision: u32,
    /// The tasks, in execution order.
    pub tasks: Vec<PlannedTask>,
}

impl Plan {
    /// Create the initial plan (revision 0) from parsed tasks.
    pub fn new(tasks: Vec<PlannedTask>) -> Self {
        Self {
            id: Uuid::new_v4(),
            revision: 0,
            tasks,
        }
    }

    /// Create the successor plan carrying the given task sequence.
    pub fn revised(&self, tasks: Vec<PlannedTask>) -> Self {
        Self {
            id: self.id,
            revision: self.revision + 1,
            tasks,
        }
    }

    /// Number of tasks in this plan version.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether this plan version has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Position of the task with the given id, if present.
    pub fn position_of(&self, task_id: &str) -> Option<usize> {
        self.tasks.iter().position(|p| p.task.id == task_id)
    }

    /// Display name of the task following `task_id`, if any.
    pub fn next_after(&self, task_id: &str) -> Option<&PlannedTask> {
        let pos = self.position_of(task_id)?;
        self.tasks.get(pos + 1)
    }

    /// Count of tasks strictly after `task_id`. `None` if the id is absent.
    pub fn remaining_after(&self, task_id: &str) -> Option<usize> {
        let pos = self.position_of(task_id)?;
        Some(self.tasks.len() - pos - 1)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plan(revision={}, {} tasks)", self.revision, self.tasks.len())?;
        for planned in &self.tasks {
            writeln!(
                f,
                "  [{}] {} -> {}",
                planned.task.id, planned.task.role, planned.task.description
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::AgentRole;
    use crate::task::Task;

    fn planned(id: &str, description: &str) -> PlannedTask {
        PlannedTask {
            display_name: description.to_string(),
            task: Task {
                id: id.to_string(),
                role: AgentRole::Coder,
                description: description.to_string(),
                depends_on: Vec::new(),
            },
        }
    }

    #[test]
    fn test_revised_keeps_identity_and_bumps_revision() {
        let plan = Plan::new(vec![planned("1", "a"), planned("2", "b")]);
        let next = plan.revised(vec![planned("1", "a"), planned("2", "c")]);
        assert_eq!(next.id, plan.id);
        assert_eq!(next.revision, 1);
        assert_eq!(plan.revision, 0);
    }

    #[test]
    fn test_position_and_remaining() {
        let plan = Plan::new(vec![planned("1", "a"), planned("2", "b"), planned("3", "c")]);
        assert_eq!(plan.position_of("2"), Some(1));
        assert_eq!(plan.remaining_after("2"), Some(1));
        assert_eq!(plan.remaining_after("3"), Some(0));
        assert_eq!(plan.remaining_after("99"), None);
        assert_eq!(plan.next_after("1").map(|p| p.task.id.as_str()), Some("2"));
        assert!(plan.next_after("3").is_none());
    }
}
