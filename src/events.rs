//! Structured audit events and the reporting seam.
//!
//! The reporter is an explicitly passed handle, injected by the
//! orchestration entry point, not a global singleton. Every method returns
//! `()` and has a default no-op body, so reporting can never abort
//! orchestration.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::roles::AgentRole;
use crate::task::Task;

/// A plan was successfully created or re-created from oracle text.
#[derive(Debug, Clone, Serialize)]
pub struct PlanCreatedEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// Plan revision counter (0 for the initial plan).
    pub revision: u32,
    /// Snapshot of the plan's tasks.
    pub tasks: Vec<Task>,
}

/// An oracle reply failed structural plan validation.
#[derive(Debug, Clone, Serialize)]
pub struct PlanParseFailedEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// Description of the validation failure.
    pub error: String,
    /// The raw oracle answer that failed to parse.
    pub answer: String,
}

/// A task was handed to its executor.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStartedEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// Id of the task.
    pub task_id: String,
    /// Executor role handling the task.
    pub role: AgentRole,
    /// The full prompt handed to the executor, context document included.
    pub prompt: String,
}

/// A task's executor call finished (successfully or not).
#[derive(Debug, Clone, Serialize)]
pub struct TaskFinishedEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// Id of the task.
    pub task_id: String,
    /// Executor role that handled the task.
    pub role: AgentRole,
    /// The recorded output text (or the error text if the call raised).
    pub output: String,
    /// The executor's own success signal; false when the call raised.
    pub success: bool,
}

/// A revision replaced the working plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRevisedEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// Id of the task whose completion triggered the revision.
    pub completed_id: String,
    /// Revision counter of the new plan.
    pub revision: u32,
    /// Snapshot of the new plan's tasks.
    pub tasks: Vec<Task>,
}

/// A revision round decided to keep the existing plan.
#[derive(Debug, Clone, Serialize)]
pub struct NoUpdateEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// Id of the task whose completion triggered the revision check.
    pub completed_id: String,
}

/// The orchestration run reached a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct RunFinishedEvent {
    /// Event creation time.
    pub at: DateTime<Utc>,
    /// The last task's result text; `None` when no task ever executed.
    pub final_output: Option<String>,
    /// Whether the run stopped at a cancellation point.
    pub cancelled: bool,
}

/// Receives structured audit events from the orchestration engine.
///
/// Implementations must not block for long; the engine calls them inline
/// on its single logical thread of control.
pub trait Reporter: Send + Sync {
    /// A plan was created from oracle text.
    fn plan_created(&self, _event: &PlanCreatedEvent) {}
    /// An oracle reply failed plan validation.
    fn plan_parse_failed(&self, _event: &PlanParseFailedEvent) {}
    /// A task was handed to its executor.
    fn task_started(&self, _event: &TaskStartedEvent) {}
    /// A task's executor call finished.
    fn task_finished(&self, _event: &TaskFinishedEvent) {}
    /// A revision replaced the working plan.
    fn plan_revised(&self, _event: &PlanRevisedEvent) {}
    /// A revision round kept the existing plan.
    fn no_update_decided(&self, _event: &NoUpdateEvent) {}
    /// The run reached a terminal state.
    fn run_finished(&self, _event: &RunFinishedEvent) {}
}

/// Reporter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Reporter that forwards events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn plan_created(&self, event: &PlanCreatedEvent) {
        log::info!(
            "plan created (revision {}, {} tasks)",
            event.revision,
            event.tasks.len()
        );
    }

    fn plan_parse_failed(&self, event: &PlanParseFailedEvent) {
        log::warn!("plan parse failed: {}", event.error);
    }

    fn task_started(&self, event: &TaskStartedEvent) {
        log::info!("task {} started (role {})", event.task_id, event.role);
    }

    fn task_finished(&self, event: &TaskFinishedEvent) {
        log::info!(
            "task {} finished (role {}, success: {})",
            event.task_id,
            event.role,
            event.success
        );
    }

    fn plan_revised(&self, event: &PlanRevisedEvent) {
        log::info!(
            "plan revised after task {} (revision {}, {} tasks)",
            event.completed_id,
            event.revision,
            event.tasks.len()
        );
    }

    fn no_update_decided(&self, event: &NoUpdateEvent) {
        log::info!("no plan update required after task {}", event.completed_id);
    }

    fn run_finished(&self, event: &RunFinishedEvent) {
        log::info!(
            "run finished (cancelled: {}, produced output: {})",
            event.cancelled,
            event.final_output.is_some()
        );
    }
}
