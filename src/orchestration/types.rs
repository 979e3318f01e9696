//! Type definitions for the orchestration subsystem.
//!
//! These types form the shared vocabulary between the
//! [`super::registry::SubAgentRegistry`], the [`super::orchestrator::Orchestrator`],
//! and the config loader (which deserializes [`SubAgentConfig`] from TOML).

use serde::{Deserialize, Serialize};

/// A named agent persona.
///
/// Immutable once registered; registering the same name again replaces it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAgentConfig {
    /// Unique key.
    pub name: String,
    /// Used verbatim as the system prompt.
    pub role_prompt: String,
    /// Model to use instead of the registry default.
    #[serde(default)]
    pub model_override: Option<String>,
    /// Tool names this agent may call. `None` means every registered tool;
    /// an empty list means none (the agent runs one-shot).
    #[serde(default)]
    pub allowed_tools: Option<Vec<String>>,
}

impl SubAgentConfig {
    pub fn new(name: impl Into<String>, role_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role_prompt: role_prompt.into(),
            model_override: None,
            allowed_tools: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = Some(tools.into_iter().map(Into::into).collect());
        self
    }
}

/// One delegated unit of work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(alias = "agentName", alias = "agent_name")]
    pub agent: String,
    pub prompt: String,
}

impl PlanStep {
    pub fn new(agent: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            prompt: prompt.into(),
        }
    }
}

/// A decomposition of a user request into sub-agent invocations. Transient;
/// produced by the planning phase and consumed by the execute phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub parallel: bool,
}

/// Outcome of one delegated step. Exactly one of `output` (non-empty on
/// success) or `error` describes the result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubAgentResult {
    pub agent_name: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the step in seconds.
    #[serde(default)]
    pub elapsed_secs: f64,
}

impl SubAgentResult {
    pub fn success(agent_name: impl Into<String>, output: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            agent_name: agent_name.into(),
            output: output.into(),
            error: None,
            elapsed_secs,
        }
    }

    pub fn failure(agent_name: impl Into<String>, error: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            agent_name: agent_name.into(),
            output: String::new(),
            error: Some(error.into()),
            elapsed_secs,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
