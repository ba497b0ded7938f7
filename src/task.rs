//! Task data model: the unit of work the orchestration loop drives.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::roles::AgentRole;

/// Description used when the oracle omits the `task` field.
pub const DEFAULT_TASK_DESCRIPTION: &str = "No task description";

/// A single unit of work bound to one executor role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier unique within a plan version. Assigned by the oracle or
    /// defaulted to the task's 1-based position at parse time.
    pub id: String,

    /// The executor capability that handles this task.
    #[serde(rename = "agent")]
    pub role: AgentRole,

    /// Free-text instruction passed to the executor.
    #[serde(rename = "task")]
    pub description: String,

    /// Ids of tasks whose results must be supplied as context. Empty means
    /// no dependency.
    #[serde(rename = "need", default)]
    pub depends_on: Vec<String>,
}

/// A task paired with the human-readable label reconciled at parse time.
///
/// The label comes either from the oracle's narrative headings or, when the
/// heading count diverges from the structured task count, from the task's
/// own description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Human-facing label for this task.
    pub display_name: String,
    /// The task record itself.
    pub task: Task,
}

/// The recorded outcome of one task execution.
///
/// Immutable once written to the registry; later tasks read it as context
/// but never overwrite it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// The executor's textual output, including the success/failure trailer.
    pub output: String,
    /// The executor's own outcome signal, never inferred from text content.
    pub success: bool,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task(id={}, role={}, description={})", self.id, self.role, self.description)
    }
}
