//! Error types for the plan orchestration engine.

use thiserror::Error;

use crate::roles::AgentRole;

/// Errors raised while turning raw oracle text into a validated plan.
///
/// Every variant is a hard failure for the whole text: the parser never
/// returns a partial plan. Recovery (re-prompting the oracle) is owned by
/// the planning loop, not by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanParseError {
    /// The oracle response contained no fenced ```json block at all.
    #[error("no fenced json block found in oracle response")]
    NoStructuredBlocks,

    /// Fenced blocks were present but none of them decoded as JSON.
    #[error("no fenced block decoded into usable JSON")]
    NoDecodableBlocks,

    /// A task object named an executor role that does not exist. A plan
    /// referencing a non-existent executor cannot be safely partially
    /// executed, so the entire text is rejected.
    #[error("unknown executor role '{role}' in plan")]
    UnknownRole {
        /// The role string the oracle produced.
        role: String,
    },

    /// Blocks decoded fine but yielded zero accepted tasks.
    #[error("plan contained no tasks")]
    EmptyPlan,
}

/// Errors raised by the orchestration loop and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// Planning exhausted its retry ceiling without a valid plan. The
    /// message is the fixed user-facing handoff text.
    #[error("{message}")]
    PlanningFailed {
        /// Fixed apology/handoff message surfaced to the user.
        message: String,
    },

    /// An executor role had no bound executor instance. Raised at
    /// configuration time by [`crate::executor::ExecutorSet::new`], never
    /// per task.
    #[error("no executor registered for role '{role}'")]
    MissingExecutor {
        /// The unbound role.
        role: AgentRole,
    },

    /// The reasoning oracle call itself failed.
    #[error("oracle request failed: {message}")]
    Oracle {
        /// Underlying failure description.
        message: String,
    },

    /// The executor call itself raised. Fatal to the run: the loop
    /// propagates this to the caller instead of swallowing it.
    #[error("executor failed while processing task {task_id}: {message}")]
    Executor {
        /// Id of the task being processed when the executor raised.
        task_id: String,
        /// Underlying failure description.
        message: String,
    },
}
