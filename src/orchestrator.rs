//! Top-level orchestration loop: drives a goal from plan creation to
//! completion or an explicit give-up state.
//!
//! Control flow is strictly sequential. Even tasks with disjoint
//! dependency sets never run in parallel, because the revision step after
//! each task may rewrite the remaining plan and must observe a consistent,
//! fully-updated registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::error::OrchestratorError;
use crate::events::{PlanCreatedEvent, PlanParseFailedEvent, Reporter, RunFinishedEvent};
use crate::executor::{dispatch, ExecutorSet};
use crate::oracle::Oracle;
use crate::parser;
use crate::plan::Plan;
use crate::prompts;
use crate::registry::TaskRegistry;
use crate::revision::RevisionController;

/// Tuning knobs for the orchestration engine.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How many oracle round-trips planning (and each revision round) may
    /// use before giving up. This is the retry ceiling the parser's
    /// failure path is bounded by.
    pub max_plan_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_plan_attempts: 3,
        }
    }
}

/// Cooperative cancellation handle.
///
/// Cloneable; all clones observe the same flag. Checked at loop-iteration
/// granularity only. An in-flight executor call is never preempted, and a
/// result already produced is always recorded.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next safe point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Terminal state of a successful (non-errored) orchestration run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The plan version that was executing when the run ended.
    pub plan: Plan,
    /// The last executed task's result text. `None` when cancellation
    /// prevented any task from running; an explicit value instead of an
    /// unbound result.
    pub final_output: Option<String>,
    /// Whether the run stopped at a cancellation point.
    pub cancelled: bool,
}

/// The plan orchestration engine.
///
/// Owns the collaborators for one goal-execution attempt: the reasoning
/// oracle, the role-bound executor set, and the injected audit reporter.
pub struct Orchestrator {
    oracle: Arc<dyn Oracle>,
    executors: ExecutorSet,
    reporter: Arc<dyn Reporter>,
    config: OrchestratorConfig,
    cancellation: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator with the default configuration.
    pub fn new(
        oracle: Arc<dyn Oracle>,
        executors: ExecutorSet,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            oracle,
            executors,
            reporter,
            config: OrchestratorConfig::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an externally created cancellation token instead of the
    /// orchestrator's own. Lets callers share one token across the
    /// orchestrator and whatever requests the cancellation.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// A handle that can cancel this orchestrator's run from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Ask the oracle for an initial plan for the goal.
    ///
    /// Structural failures are recovered locally by re-prompting with the
    /// corrective instruction, up to the configured attempt ceiling. The
    /// oracle declining outright (no-update token) is not retried. Both
    /// exhaust into [`OrchestratorError::PlanningFailed`] carrying the
    /// fixed handoff message.
    pub async fn plan(&self, goal: &str) -> Result<Plan, OrchestratorError> {
        let mut prompt = goal.to_string();

        for attempt in 1..=self.config.max_plan_attempts {
            let reply = self.oracle.request(&prompt).await?;

            if reply.answer.contains(prompts::NO_UPDATE_TOKEN) {
                log::info!("oracle declined to produce a plan");
                break;
            }

            match parser::parse_plan_text(&reply.answer) {
                Ok(tasks) => {
                    let plan = Plan::new(tasks);
                    log::info!("plan created with {} tasks:\n{}", plan.len(), plan);
                    self.reporter.plan_created(&PlanCreatedEvent {
                        at: Utc::now(),
                        revision: plan.revision,
                        tasks: plan.tasks.iter().map(|p| p.task.clone()).collect(),
                    });
                    return Ok(plan);
                }
                Err(err) => {
                    log::warn!(
                        "failed to make plan (attempt {} of {}): {}",
                        attempt,
                        self.config.max_plan_attempts,
                        err
                    );
                    self.reporter.plan_parse_failed(&PlanParseFailedEvent {
                        at: Utc::now(),
                        error: err.to_string(),
                        answer: reply.answer,
                    });
                    prompt = prompts::RETRY_PROMPT.to_string();
                }
            }
        }

        Err(OrchestratorError::PlanningFailed {
            message: prompts::PLANNING_FAILED_MESSAGE.to_string(),
        })
    }

    /// Drive the goal to completion or to an explicit give-up state.
    ///
    /// State machine: planning, then for each task execute (with
    /// dependency context from the registry), record, revise, advance. The
    /// cancellation flag is checked before starting each task and again
    /// after its result is recorded; a recorded result is never rolled
    /// back. An executor exception terminates the run and propagates.
    pub async fn run(&self, goal: &str) -> Result<RunSummary, OrchestratorError> {
        let mut plan = self.plan(goal).await?;
        let mut registry = TaskRegistry::new();
        let controller = RevisionController::new(
            self.oracle.as_ref(),
            self.reporter.as_ref(),
            self.config.max_plan_attempts,
        );

        let mut final_output: Option<String> = None;
        let mut cancelled = false;
        let mut index = 0;

        while index < plan.len() {
            if self.cancellation.is_cancelled() {
                log::info!("cancellation requested, stopping before task {}", index + 1);
                cancelled = true;
                break;
            }

            let planned = plan.tasks[index].clone();
            log::info!(
                "step {} of {}: {} (assigned role {})",
                index + 1,
                plan.len(),
                planned.display_name,
                planned.task.role
            );

            let context = registry.context_for(&planned.task.depends_on);
            let result = dispatch(
                &planned.task,
                &self.executors,
                &context,
                self.reporter.as_ref(),
            )
            .await?;

            let success = result.success;
            final_output = Some(result.output.clone());
            registry.record(&planned.task.id, result);

            if self.cancellation.is_cancelled() {
                log::info!("cancellation requested, stopping after task {}", planned.task.id);
                cancelled = true;
                break;
            }

            plan = controller
                .revise(goal, &plan, &registry, &planned.task.id, success)
                .await?;
            index += 1;
        }

        let summary = RunSummary {
            plan,
            final_output,
            cancelled,
        };
        self.reporter.run_finished(&RunFinishedEvent {
            at: Utc::now(),
            final_output: summary.final_output.clone(),
            cancelled: summary.cancelled,
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlanParseError;
    use crate::events::NullReporter;
    use crate::executor::{Executor, ExecutorReply};
    use crate::oracle::OracleReply;
    use crate::roles::AgentRole;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    const TWO_TASK_ANSWER: &str = r#"```json
{"plan": [
  {"agent": "coder", "id": "1", "task": "write the function"},
  {"agent": "coder", "id": "2", "need": ["1"], "task": "test the function"}
]}
```"#;

    /// Oracle replaying scripted answers; repeats NO_UPDATE when empty.
    struct ScriptedOracle {
        answers: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(answers: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.iter().rev().map(|a| a.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn request(&self, _prompt: &str) -> Result<OracleReply, OrchestratorError> {
            let answer = self
                .answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| prompts::NO_UPDATE_TOKEN.to_string());
            Ok(OracleReply::answer_only(answer))
        }
    }

    /// Executor recording the prompts it sees and echoing per-call outputs.
    struct RecordingExecutor {
        prompts: Mutex<Vec<String>>,
        cancel_on_process: Option<CancellationToken>,
    }

    impl RecordingExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                cancel_on_process: None,
            })
        }

        fn cancelling(token: CancellationToken) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                cancel_on_process: Some(token),
            })
        }
    }

    #[async_trait]
    impl Executor for RecordingExecutor {
        async fn process(&self, prompt: &str) -> Result<ExecutorReply, OrchestratorError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            let call = prompts.len();
            if let Some(token) = &self.cancel_on_process {
                // Simulates a cancellation request arriving mid-task.
                token.cancel();
            }
            Ok(ExecutorReply {
                output: format!("R{}", call),
                reasoning: String::new(),
            })
        }

        fn was_successful(&self) -> bool {
            true
        }
    }

    fn executor_set(executor: Arc<RecordingExecutor>) -> ExecutorSet {
        let mut executors: HashMap<AgentRole, Arc<dyn Executor>> = HashMap::new();
        for role in AgentRole::ALL {
            executors.insert(role, executor.clone());
        }
        ExecutorSet::new(executors).unwrap()
    }

    #[tokio::test]
    async fn test_two_task_scenario_injects_dependency_context() {
        init_logging();
        let oracle = ScriptedOracle::new(&[TWO_TASK_ANSWER]);
        let executor = RecordingExecutor::new();
        let orchestrator = Orchestrator::new(
            oracle,
            executor_set(executor.clone()),
            Arc::new(NullReporter),
        );

        let summary = orchestrator.run("build and test a function").await.unwrap();

        assert!(!summary.cancelled);
        let output = summary.final_output.unwrap();
        assert!(output.starts_with("R2"));

        let prompts_seen = executor.prompts.lock().unwrap();
        assert_eq!(prompts_seen.len(), 2);
        // Task 1 runs with no dependency context.
        assert!(prompts_seen[0].contains(prompts::NO_CONTEXT_PLACEHOLDER));
        // Task 2 sees task 1's recorded result (trailer included).
        assert!(prompts_seen[1].contains("According to task 1"));
        assert!(prompts_seen[1].contains("R1"));
    }

    #[tokio::test]
    async fn test_planning_retries_then_fails_with_fixed_message() {
        init_logging();
        let oracle = ScriptedOracle::new(&["prose", "more prose", "still prose"]);
        let executor = RecordingExecutor::new();
        let orchestrator = Orchestrator::new(
            oracle,
            executor_set(executor.clone()),
            Arc::new(NullReporter),
        );

        let err = orchestrator.run("goal").await.unwrap_err();
        assert_eq!(
            err,
            OrchestratorError::PlanningFailed {
                message: prompts::PLANNING_FAILED_MESSAGE.to_string()
            }
        );
        assert!(executor.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_planning_recovers_on_retry() {
        init_logging();
        let oracle = ScriptedOracle::new(&["no blocks here", TWO_TASK_ANSWER]);
        let executor = RecordingExecutor::new();
        let orchestrator = Orchestrator::new(
            oracle,
            executor_set(executor.clone()),
            Arc::new(NullReporter),
        );

        let summary = orchestrator.run("goal").await.unwrap();
        assert_eq!(executor.prompts.lock().unwrap().len(), 2);
        assert!(summary.final_output.is_some());
    }

    #[tokio::test]
    async fn test_oracle_decline_fails_without_retry() {
        init_logging();
        let oracle = ScriptedOracle::new(&[]);
        let executor = RecordingExecutor::new();
        let orchestrator =
            Orchestrator::new(oracle, executor_set(executor), Arc::new(NullReporter));

        let err = orchestrator.plan("goal").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::PlanningFailed { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_mid_task_records_result_and_stops() {
        init_logging();
        let oracle = ScriptedOracle::new(&[TWO_TASK_ANSWER]);
        // The executor cancels the shared token while task 1 is in flight.
        let token = CancellationToken::new();
        let executor = RecordingExecutor::cancelling(token.clone());
        let orchestrator = Orchestrator::new(
            oracle,
            executor_set(executor.clone()),
            Arc::new(NullReporter),
        )
        .with_cancellation(token);

        let summary = orchestrator.run("goal").await.unwrap();

        assert!(summary.cancelled);
        // Task 1's result was recorded and surfaced; task 2 never started.
        assert_eq!(executor.prompts.lock().unwrap().len(), 1);
        assert!(summary.final_output.unwrap().starts_with("R1"));
    }

    #[tokio::test]
    async fn test_cancellation_before_first_task_yields_no_output() {
        init_logging();
        let oracle = ScriptedOracle::new(&[TWO_TASK_ANSWER]);
        let executor = RecordingExecutor::new();
        let orchestrator = Orchestrator::new(
            oracle,
            executor_set(executor.clone()),
            Arc::new(NullReporter),
        );
        orchestrator.cancellation_token().cancel();

        let summary = orchestrator.run("goal").await.unwrap();

        assert!(summary.cancelled);
        assert!(summary.final_output.is_none());
        assert!(executor.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revision_rewrites_remaining_plan() {
        init_logging();
        let revision_answer = r#"```json
{"plan": [
  {"agent": "coder", "id": "1", "task": "write the function"},
  {"agent": "coder", "id": "2", "need": ["1"], "task": "fix the build first"}
]}
```"#;
        let oracle = ScriptedOracle::new(&[TWO_TASK_ANSWER, revision_answer]);
        let executor = RecordingExecutor::new();
        let orchestrator = Orchestrator::new(
            oracle,
            executor_set(executor.clone()),
            Arc::new(NullReporter),
        );

        let summary = orchestrator.run("goal").await.unwrap();

        assert_eq!(summary.plan.revision, 1);
        assert_eq!(
            summary.plan.tasks[1].task.description,
            "fix the build first"
        );
        // Two tasks still executed: the original task 1 and the revised task 2.
        assert_eq!(executor.prompts.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_role_is_a_parse_error_not_a_dispatch_miss() {
        let err = parser::parse_plan_text(
            "```json\n{\"plan\": [{\"agent\": \"router\", \"id\": \"1\", \"task\": \"x\"}]}\n```",
        )
        .unwrap_err();
        assert!(matches!(err, PlanParseError::UnknownRole { .. }));
    }
}
