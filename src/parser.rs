//! Plan parser: turns raw oracle text into a validated, ordered task
//! sequence.
//!
//! The contract is all-or-nothing: either every accepted task object passes
//! validation and a full plan comes back, or the whole text is rejected
//! with a [`PlanParseError`]. There is no partial plan, because a plan
//! referencing a non-existent executor cannot be safely partially executed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::PlanParseError;
use crate::roles::AgentRole;
use crate::task::{PlannedTask, Task, DEFAULT_TASK_DESCRIPTION};

/// Fenced ```json block, non-greedy so multiple blocks in one reply are
/// each captured separately.
static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("Invalid regex"));

/// Extract display names from the oracle's narrative text.
///
/// A trimmed non-empty line qualifies if it contains a heading marker
/// (`##`) or begins with a digit (e.g. `1. Search for the docs`). The scan
/// is independent of structured parsing and used purely for human-facing
/// labels.
pub fn scan_display_names(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.contains("##") || line.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            names.push(line.to_string());
        }
    }
    log::debug!("found {} display names", names.len());
    names
}

/// Locate all fenced ```json segments in the text.
fn extract_blocks(text: &str) -> Vec<&str> {
    JSON_BLOCK_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Parse raw oracle text into an ordered sequence of planned tasks.
///
/// Accepted block shapes:
/// - `{"plan": [ {task object}, ... ]}`
/// - a single bare task object with `agent` and `task` fields
///
/// Per task object, a missing `id` defaults to the 1-based running count of
/// accepted tasks, a missing `task` description defaults to a placeholder,
/// and an optional `need` array (string or numeric ids) populates the
/// dependency set. An undecodable block is skipped; an unknown `agent`
/// value rejects the entire text.
///
/// Display names are reconciled at the end: when the scanned heading count
/// differs from the structured task count, labels are synthesized from the
/// task descriptions instead, so a divergent narrative can never mislabel
/// the plan.
pub fn parse_plan_text(text: &str) -> Result<Vec<PlannedTask>, PlanParseError> {
    let names = scan_display_names(text);

    let blocks = extract_blocks(text);
    if blocks.is_empty() {
        log::warn!("no json blocks found in oracle response");
        return Err(PlanParseError::NoStructuredBlocks);
    }

    let mut tasks: Vec<Task> = Vec::new();
    let mut decoded_any = false;
    for block in blocks {
        let value: Value = match serde_json::from_str(block) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("failed to decode json block: {}", err);
                continue;
            }
        };
        decoded_any = true;

        if let Some(entries) = value.get("plan").and_then(Value::as_array) {
            for entry in entries {
                let Some(object) = entry.as_object() else {
                    log::warn!("plan entry is not an object, skipping: {}", entry);
                    continue;
                };
                if let Some(task) = task_from_object(object, tasks.len())? {
                    tasks.push(task);
                }
            }
        } else if value.get("agent").is_some() && value.get("task").is_some() {
            // Single-task shape: the oracle returned one task object
            // without the plan container.
            log::debug!("detected single task format, converting to plan");
            if let Some(object) = value.as_object() {
                if let Some(task) = task_from_object(object, tasks.len())? {
                    tasks.push(task);
                }
            }
        } else {
            log::warn!("json block decoded but matched no known plan shape");
        }
    }

    if !decoded_any {
        return Err(PlanParseError::NoDecodableBlocks);
    }
    if tasks.is_empty() {
        return Err(PlanParseError::EmptyPlan);
    }

    Ok(reconcile_display_names(names, tasks))
}

/// Build one task from a decoded object, or `None` if the object is
/// skippable (missing `agent` field). An unknown role is fatal for the
/// whole text.
fn task_from_object(
    object: &Map<String, Value>,
    accepted_so_far: usize,
) -> Result<Option<Task>, PlanParseError> {
    let Some(agent) = object.get("agent").and_then(Value::as_str) else {
        log::warn!("task object missing 'agent' field, skipping");
        return Ok(None);
    };

    let role = AgentRole::parse(agent).ok_or_else(|| {
        log::warn!("agent '{}' does not exist", agent);
        PlanParseError::UnknownRole {
            role: agent.to_string(),
        }
    })?;

    let id = match object.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => (accepted_so_far + 1).to_string(),
    };

    let description = object
        .get("task")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_TASK_DESCRIPTION)
        .to_string();

    // `need` ids show up as strings or bare numbers depending on the
    // oracle's mood; normalize both to strings so registry lookups match.
    let depends_on = match object.get("need") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(id) => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(Some(Task {
        id,
        role,
        description,
        depends_on,
    }))
}

/// Pair tasks with display names, falling back to description-based labels
/// when the narrative and the structured block diverge in count.
fn reconcile_display_names(names: Vec<String>, tasks: Vec<Task>) -> Vec<PlannedTask> {
    if names.len() != tasks.len() {
        log::debug!(
            "display name count {} differs from task count {}, synthesizing labels",
            names.len(),
            tasks.len()
        );
        return tasks
            .into_iter()
            .map(|task| PlannedTask {
                display_name: task.description.clone(),
                task,
            })
            .collect();
    }
    names
        .into_iter()
        .zip(tasks)
        .map(|(display_name, task)| PlannedTask { display_name, task })
        .collect()
}
