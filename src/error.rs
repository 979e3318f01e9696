use std::path::PathBuf;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid config value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors surfaced by a [`crate::model::ModelClient`] call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Network or provider failure that may succeed on retry.
    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("Model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered, but the answer could not be used.
    #[error("Malformed model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Transport(_) | ModelError::Timeout { .. })
    }
}

/// Errors raised by a tool handler. Never aborts the tool loop; the loop
/// turns these into `is_error` tool results.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: invalid input: {message}")]
    InvalidInput { tool: String, message: String },

    #[error("{tool}: {message}")]
    Execution { tool: String, message: String },
}

/// Errors related to the tool loop and sub-agent execution.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Model(#[from] ModelError),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent '{agent}' hit the iteration cap ({max_iterations}) before finishing")]
    IterationCap { agent: String, max_iterations: usize },

    #[error("Session logging error: {0}")]
    LoggingError(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Errors from turning a planning reply into an execution plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Plan reply is not valid JSON: {message}; reply was: {snippet}")]
    InvalidJson { message: String, snippet: String },

    #[error("Plan contains no steps")]
    EmptyPlan,

    #[error("Plan step {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

/// Fatal errors of a top-level orchestration call.
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Planning request failed: {0}")]
    Planning(#[source] ModelError),

    #[error("Could not parse plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Synthesis request failed: {0}")]
    Synthesis(#[source] ModelError),

    #[error("No sub-agents are registered")]
    NoAgents,
}
