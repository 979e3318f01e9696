//! Turning a planning reply into an [`ExecutionPlan`].
//!
//! Two explicit stages: strip a surrounding Markdown code fence (if any),
//! then parse the remainder as JSON. Either stage failing is fatal for the
//! orchestration call; there is no fallback plan.

use std::sync::LazyLock;

use regex::Regex;

use super::types::ExecutionPlan;
use crate::error::PlanError;

/// Opening fence with an optional language tag (```json, ```JSON, ```).
static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("fence pattern is valid"));

const FENCE: &str = "```";

const SNIPPET_LEN: usize = 120;

/// Return the body of the fence wrapped around `raw`, or `raw` itself
/// (trimmed) when it is not fenced.
///
/// A reply that already starts with a JSON object is never unwrapped, so a
/// fenced snippet inside a step prompt stays part of the plan. Otherwise the
/// body runs from the first opening fence to the last closing fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    let Some(open) = OPENING_FENCE.find(trimmed) else {
        return trimmed;
    };
    let rest = &trimmed[open.end()..];
    let body = match rest.rfind(FENCE) {
        Some(close) => &rest[..close],
        None => rest,
    };
    body.trim()
}

/// Parse a planning reply into a plan with at least one step.
pub fn parse_plan(raw: &str) -> Result<ExecutionPlan, PlanError> {
    let body = strip_code_fences(raw);
    let plan: ExecutionPlan = serde_json::from_str(body).map_err(|e| PlanError::InvalidJson {
        message: e.to_string(),
        snippet: snippet(body),
    })?;

    if plan.steps.is_empty() {
        return Err(PlanError::EmptyPlan);
    }
    for (i, step) in plan.steps.iter().enumerate() {
        if step.agent.trim().is_empty() {
            return Err(PlanError::EmptyField {
                index: i + 1,
                field: "agent",
            });
        }
        if step.prompt.trim().is_empty() {
            return Err(PlanError::EmptyField {
                index: i + 1,
                field: "prompt",
            });
        }
    }
    Ok(plan)
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{"steps":[{"agent":"researcher","prompt":"find facts"},{"agent":"writer","prompt":"draft"}],"parallel":true}"#;

    #[test]
    fn strips_json_fence() {
        let raw = format!("```json\n{PLAN}\n```");
        assert_eq!(strip_code_fences(&raw), PLAN);
    }

    #[test]
    fn strips_bare_fence_with_surrounding_prose() {
        let raw = format!("Here is the plan:\n```\n{PLAN}\n```\nLet me know.");
        assert_eq!(strip_code_fences(&raw), PLAN);
    }

    #[test]
    fn fence_inside_a_fenced_plan_prompt_is_kept() {
        let inner = r#"{"steps":[{"agent":"writer","prompt":"Show usage in a ```bash\nls\n``` block"}],"parallel":false}"#;
        let raw = format!("```json\n{inner}\n```");
        assert_eq!(strip_code_fences(&raw), inner);

        let plan = parse_plan(&raw).unwrap();
        assert!(plan.steps[0].prompt.contains("```bash"));
    }

    #[test]
    fn unfenced_plan_with_fenced_snippet_in_prompt_parses_whole() {
        let raw = r#"{"steps":[{"agent":"coder","prompt":"Fix this:\n```rust\nfn main(){}\n```"}],"parallel":false}"#;
        assert_eq!(strip_code_fences(raw), raw);

        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.steps[0].agent, "coder");
        assert!(plan.steps[0].prompt.contains("fn main(){}"));
    }

    #[test]
    fn unfenced_text_is_trimmed() {
        let raw = format!("  \n{PLAN}\n ");
        assert_eq!(strip_code_fences(&raw), PLAN);
    }

    #[test]
    fn parses_fenced_plan() {
        let plan = parse_plan(&format!("```json\n{PLAN}\n```")).unwrap();
        assert!(plan.parallel);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].agent, "researcher");
        assert_eq!(plan.steps[1].prompt, "draft");
    }

    #[test]
    fn parallel_defaults_to_false_and_agent_name_alias_is_accepted() {
        let plan = parse_plan(r#"{"steps":[{"agentName":"writer","prompt":"go"}]}"#).unwrap();
        assert!(!plan.parallel);
        assert_eq!(plan.steps[0].agent, "writer");
    }

    #[test]
    fn non_json_in_fence_is_fatal() {
        let err = parse_plan("```json\nfirst research, then write\n```").unwrap_err();
        assert!(matches!(err, PlanError::InvalidJson { .. }));
    }

    #[test]
    fn prose_without_fence_is_fatal() {
        let err = parse_plan(&format!("Sure! {PLAN}")).unwrap_err();
        assert!(matches!(err, PlanError::InvalidJson { .. }));
    }

    #[test]
    fn zero_steps_is_fatal() {
        let err = parse_plan(r#"{"steps":[],"parallel":false}"#).unwrap_err();
        assert!(matches!(err, PlanError::EmptyPlan));
    }

    #[test]
    fn blank_prompt_is_fatal() {
        let err = parse_plan(r#"{"steps":[{"agent":"writer","prompt":"  "}]}"#).unwrap_err();
        assert!(matches!(err, PlanError::EmptyField { index: 1, field: "prompt" }));
    }

    #[test]
    fn snippet_is_char_boundary_safe() {
        let long = "é".repeat(SNIPPET_LEN + 10);
        let s = snippet(&long);
        assert!(s.ends_with("..."));
        assert_eq!(s.chars().count(), SNIPPET_LEN + 3);
    }
}
