//! Prompt templates and protocol constants for the oracle conversation.
//!
//! The textual protocol has exactly two recognized oracle response shapes
//! on the revision path: a fenced ```json plan block, or the literal
//! [`NO_UPDATE_TOKEN`].

use std::collections::HashMap;

/// Literal token the oracle emits to signal "no revision needed".
pub const NO_UPDATE_TOKEN: &str = "NO_UPDATE";

/// Corrective instruction sent after a structural plan failure.
pub const RETRY_PROMPT: &str = "Failed to parse the tasks. Please write down your task followed \
     by a json plan within ```json. Do not ask for clarification.";

/// Fixed apology/handoff message surfaced when planning exhausts its
/// retry ceiling.
pub const PLANNING_FAILED_MESSAGE: &str =
    "I couldn't find a way to turn this request into a workable plan. \
     Please clarify the request and try again.";

/// Placeholder used in the context document when a task has no usable
/// dependency results.
pub const NO_CONTEXT_PLACEHOLDER: &str = "No needed information.";

/// Trailer appended to a recorded task output so the revision prompt
/// carries the outcome alongside the text.
pub fn success_trailer(success: bool) -> &'static str {
    if success {
        "\nAgent succeeded with task."
    } else {
        "\nAgent failed with task (Error detected)."
    }
}

/// Build the prompt handed to an executor: the dependency context document
/// followed by the task instruction.
///
/// Context entries are ordered by task id so the document is deterministic.
pub fn task_prompt(description: &str, context: &HashMap<String, String>) -> String {
    let infos = if context.is_empty() {
        NO_CONTEXT_PLACEHOLDER.to_string()
    } else {
        let mut ids: Vec<&String> = context.keys().collect();
        ids.sort();
        let mut infos = String::new();
        for id in ids {
            infos.push_str(&format!("\t- According to task {}:\n{}\n\n", id, context[id]));
        }
        infos
    };
    format!(
        "You are given information from preceding task results:\n{}\nYour task is:\n{}",
        infos, description
    )
}

/// Build the re-planning prompt sent to the oracle after a task completes.
///
/// The prompt instructs the oracle to either answer [`NO_UPDATE_TOKEN`] or
/// rewrite the whole plan changing only the tasks after `completed_id`,
/// growing it by at most one step. The controller does not trust that
/// instruction; the revision splice enforces it structurally.
pub fn revision_prompt(
    goal: &str,
    completed_id: &str,
    completed_output: &str,
    success: bool,
    next_task: Option<&str>,
) -> String {
    let outcome = if success { "success" } else { "failure" };
    let next_framing = match next_task {
        Some(name) => format!("Next task is: {}.", name),
        None => "No task follows, this was the last step. If it failed add a task to recover."
            .to_string(),
    };
    format!(
        r#"Your goal is: {goal}
You previously made a plan, agents are currently working on it.
The last agent working on task {completed_id} did the following work:
{completed_output}
Task {completed_id} work was a {outcome} according to the system interpreter.
{next_framing}
Is the work done for task {completed_id} leading to success or failure? Did an agent fail with a task?
If the work was good: answer "{NO_UPDATE_TOKEN}"
If the work is leading to failure: update the plan with the EXACT format:
```json
{{
  "plan": [
    {{
      "agent": "agent_name",
      "id": "task_id",
      "need": ["dependency_ids"],
      "task": "task_description"
    }}
  ]
}}
```
You need to rewrite the whole plan, but only change the tasks after task {completed_id}.
Make the plan the same length as the original one or with only one additional step.
Do not change past tasks. Change next tasks."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_prompt_without_context_uses_placeholder() {
        let prompt = task_prompt("write a function", &HashMap::new());
        assert!(prompt.contains(NO_CONTEXT_PLACEHOLDER));
        assert!(prompt.contains("write a function"));
    }

    #[test]
    fn test_task_prompt_orders_context_by_id() {
        let mut context = HashMap::new();
        context.insert("2".to_string(), "second".to_string());
        context.insert("1".to_string(), "first".to_string());
        let prompt = task_prompt("test it", &context);
        let first = prompt.find("According to task 1").unwrap();
        let second = prompt.find("According to task 2").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_revision_prompt_framings() {
        let with_next = revision_prompt("goal", "1", "output", true, Some("test the function"));
        assert!(with_next.contains("Next task is: test the function."));
        assert!(with_next.contains("a success according"));

        let last = revision_prompt("goal", "2", "output", false, None);
        assert!(last.contains("this was the last step"));
        assert!(last.contains("a failure according"));
        assert!(last.contains(NO_UPDATE_TOKEN));
    }
}
