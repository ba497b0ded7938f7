//! Plan revision controller: closed-loop re-planning after each task.
//!
//! After a task completes, the oracle is asked whether the remaining plan
//! should change. The oracle is *instructed* to preserve the past, but it
//! is not trusted to: the controller splices the oracle's proposed suffix
//! onto the already-locked prefix by id and rejects any proposal that
//! redefines a completed task or grows the remaining work by more than one
//! step. A rejected or unusable proposal keeps the current plan; an update
//! attempt must never destroy a currently-valid plan.

use std::collections::HashSet;

use chrono::Utc;
use thiserror::Error;

use crate::error::OrchestratorError;
use crate::events::{NoUpdateEvent, PlanRevisedEvent, Reporter};
use crate::oracle::Oracle;
use crate::parser;
use crate::plan::Plan;
use crate::prompts;
use crate::registry::TaskRegistry;
use crate::task::PlannedTask;

/// Why a structurally valid proposal was still rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionRejection {
    /// The proposal assigns a different role, description, or dependency
    /// set to a task at or before the just-completed one.
    #[error("proposal redefines completed task {id}")]
    RedefinesCompleted {
        /// Id of the redefined task.
        id: String,
    },

    /// The proposal grows the remaining task count by more than one.
    #[error("proposal grows remaining tasks from {from} to {to}")]
    GrowsRemaining {
        /// Remaining count before the revision.
        from: usize,
        /// Remaining count the proposal asked for.
        to: usize,
    },

    /// The completed id is not in the executing plan. Should not happen in
    /// normal flow; treated as "keep the current plan".
    #[error("completed task {id} not found in executing plan")]
    UnknownCompletedId {
        /// The id that failed to resolve.
        id: String,
    },
}

/// Splice an oracle proposal onto the locked prefix of the executing plan.
///
/// Tasks up to and including `completed_id` are kept verbatim from
/// `current`; the proposal contributes only tasks with ids outside that
/// prefix, in proposal order. Enforces both plan-mutation invariants: the
/// past is immutable, and the remaining count grows by at most one.
pub fn splice(
    current: &Plan,
    proposal: Vec<PlannedTask>,
    completed_id: &str,
) -> Result<Vec<PlannedTask>, RevisionRejection> {
    let cut = current
        .position_of(completed_id)
        .ok_or_else(|| RevisionRejection::UnknownCompletedId {
            id: completed_id.to_string(),
        })?;
    let prefix = &current.tasks[..=cut];

    for kept in prefix {
        if let Some(proposed) = proposal.iter().find(|p| p.task.id == kept.task.id) {
            if proposed.task != kept.task {
                return Err(RevisionRejection::RedefinesCompleted {
                    id: kept.task.id.clone(),
                });
            }
        }
    }

    let prefix_ids: HashSet<&str> = prefix.iter().map(|p| p.task.id.as_str()).collect();
    let suffix: Vec<PlannedTask> = proposal
        .into_iter()
        .filter(|p| !prefix_ids.contains(p.task.id.as_str()))
        .collect();

    let previous_remaining = current.tasks.len() - (cut + 1);
    if suffix.len() > previous_remaining + 1 {
        return Err(RevisionRejection::GrowsRemaining {
            from: previous_remaining,
            to: suffix.len(),
        });
    }

    let mut tasks = prefix.to_vec();
    tasks.extend(suffix);
    Ok(tasks)
}

/// Drives one revision round against the oracle.
pub struct RevisionController<'a> {
    oracle: &'a dyn Oracle,
    reporter: &'a dyn Reporter,
    /// How many oracle round-trips a single revision may use before the
    /// controller gives up and keeps the current plan.
    max_attempts: u32,
}

impl<'a> RevisionController<'a> {
    /// Create a controller over the given collaborators.
    pub fn new(oracle: &'a dyn Oracle, reporter: &'a dyn Reporter, max_attempts: u32) -> Self {
        Self {
            oracle,
            reporter,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Ask the oracle whether the remaining plan should change after
    /// `completed_id` finished with the given success flag.
    ///
    /// Returns the plan to continue executing with: either the unchanged
    /// current plan (no-update token, unusable reply, rejected proposal,
    /// or identical proposal) or an accepted successor plan with a bumped
    /// revision counter.
    pub async fn revise(
        &self,
        goal: &str,
        plan: &Plan,
        registry: &TaskRegistry,
        completed_id: &str,
        success: bool,
    ) -> Result<Plan, OrchestratorError> {
        let Some(completed) = registry.get(completed_id) else {
            log::warn!(
                "no recorded result for task {}, skipping revision",
                completed_id
            );
            return Ok(plan.clone());
        };

        let next_task = plan
            .next_after(completed_id)
            .map(|p| p.display_name.clone());
        let mut prompt = prompts::revision_prompt(
            goal,
            completed_id,
            &completed.output,
            success,
            next_task.as_deref(),
        );

        for attempt in 1..=self.max_attempts {
            let reply = self.oracle.request(&prompt).await?;

            if reply.answer.contains(prompts::NO_UPDATE_TOKEN) {
                self.keep_current(completed_id);
                return Ok(plan.clone());
            }

            let proposal = match parser::parse_plan_text(&reply.answer) {
                Ok(proposal) => proposal,
                Err(err) => {
                    log::warn!(
                        "revision reply failed to parse (attempt {} of {}): {}",
                        attempt,
                        self.max_attempts,
                        err
                    );
                    prompt = prompts::RETRY_PROMPT.to_string();
                    continue;
                }
            };

            return match splice(plan, proposal, completed_id) {
                Ok(tasks) if tasks == plan.tasks => {
                    // Proposal changed nothing; keep the current plan
                    // object rather than minting a new revision.
                    self.keep_current(completed_id);
                    Ok(plan.clone())
                }
                Ok(tasks) => {
                    let revised = plan.revised(tasks);
                    log::info!(
                        "plan revised after task {} (revision {}, {} tasks)",
                        completed_id,
                        revised.revision,
                        revised.len()
                    );
                    self.reporter.plan_revised(&PlanRevisedEvent {
                        at: Utc::now(),
                        completed_id: completed_id.to_string(),
                        revision: revised.revision,
                        tasks: revised.tasks.iter().map(|p| p.task.clone()).collect(),
                    });
                    Ok(revised)
                }
                Err(rejection) => {
                    log::warn!("rejecting plan revision: {}", rejection);
                    self.keep_current(completed_id);
                    Ok(plan.clone())
                }
            };
        }

        // No usable update within the attempt budget; the current plan
        // stays in force.
        self.keep_current(completed_id);
        Ok(plan.clone())
    }

    fn keep_current(&self, completed_id: &str) {
        self.reporter.no_update_decided(&NoUpdateEvent {
            at: Utc::now(),
            completed_id: completed_id.to_string(),
        });
    }
}
