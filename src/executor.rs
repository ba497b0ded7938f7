//! Executor interface and single-task dispatch.
//!
//! Executors are bound to roles once, at configuration time; dispatch never
//! does a per-task string lookup that could miss.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::OrchestratorError;
use crate::events::{Reporter, TaskFinishedEvent, TaskStartedEvent};
use crate::prompts;
use crate::roles::AgentRole;
use crate::task::{Task, TaskResult};

/// One executor response: the result text plus any separate reasoning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorReply {
    /// The executor's textual result.
    pub output: String,
    /// Free-form reasoning emitted alongside the result. Not parsed.
    pub reasoning: String,
}

/// An external collaborator capable of performing one task role.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute the prompt and return the result text.
    async fn process(&self, prompt: &str) -> Result<ExecutorReply, OrchestratorError>;

    /// The executor's own outcome signal for the most recent `process`
    /// call. Queried out of band after `process` returns; never inferred
    /// from the result text.
    fn was_successful(&self) -> bool;
}

/// Role-to-executor bindings, validated once at configuration time.
#[derive(Clone)]
pub struct ExecutorSet {
    executors: HashMap<AgentRole, Arc<dyn Executor>>,
}

impl ExecutorSet {
    /// Build the set, requiring an executor for every [`AgentRole`]
    /// variant. Fails with [`OrchestratorError::MissingExecutor`] naming
    /// the first unbound role.
    pub fn new(
        executors: HashMap<AgentRole, Arc<dyn Executor>>,
    ) -> Result<Self, OrchestratorError> {
        for role in AgentRole::ALL {
            if !executors.contains_key(&role) {
                return Err(OrchestratorError::MissingExecutor { role });
            }
        }
        Ok(Self { executors })
    }

    /// Look up the executor bound to a role.
    pub fn get(&self, role: AgentRole) -> Option<Arc<dyn Executor>> {
        self.executors.get(&role).cloned()
    }
}

impl std::fmt::Debug for ExecutorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut roles: Vec<&AgentRole> = self.executors.keys().collect();
        roles.sort_by_key(|role| role.as_str());
        f.debug_struct("ExecutorSet").field("roles", &roles).finish()
    }
}

/// Execute exactly one task via the executor bound to its role.
///
/// The prompt is the context document assembled from the task's dependency
/// results followed by the instruction. `success` comes from the
/// executor's own signal, and the recorded output carries a success or
/// failure trailer so the revision prompt sees the outcome.
///
/// Start/finish reporting is always finalized, even when the executor call
/// raises; the error itself is then propagated, making task-level
/// exceptions fatal to the run unless the caller catches them (the
/// orchestration loop does not).
pub async fn dispatch(
    task: &Task,
    executors: &ExecutorSet,
    context: &HashMap<String, String>,
    reporter: &dyn Reporter,
) -> Result<TaskResult, OrchestratorError> {
    let executor = executors
        .get(task.role)
        .ok_or(OrchestratorError::MissingExecutor { role: task.role })?;

    if context.len() < task.depends_on.len() {
        log::warn!(
            "task {} proceeding with degraded context ({} of {} dependencies resolved)",
            task.id,
            context.len(),
            task.depends_on.len()
        );
    }

    let prompt = prompts::task_prompt(&task.description, context);

    log::info!("task {} started (role {})", task.id, task.role);
    reporter.task_started(&TaskStartedEvent {
        at: Utc::now(),
        task_id: task.id.clone(),
        role: task.role,
        prompt: prompt.clone(),
    });

    let outcome = executor.process(&prompt).await;

    match outcome {
        Ok(reply) => {
            let success = executor.was_successful();
            let mut output = reply.output;
            output.push_str(prompts::success_trailer(success));

            reporter.task_finished(&TaskFinishedEvent {
                at: Utc::now(),
                task_id: task.id.clone(),
                role: task.role,
                output: output.clone(),
                success,
            });
            log::info!("task {} finished (success: {})", task.id, success);

            Ok(TaskResult { output, success })
        }
        Err(err) => {
            // Finalize reporting before re-raising.
            reporter.task_finished(&TaskFinishedEvent {
                at: Utc::now(),
                task_id: task.id.clone(),
                role: task.role,
                output: err.to_string(),
                success: false,
            });
            log::error!("task {} executor raised: {}", task.id, err);
            Err(err)
        }
    }
}
