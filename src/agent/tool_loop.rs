//! Tool invocation loop: drives one agent's conversation through repeated
//! "model proposes tool calls -> tools run -> results go back" cycles.
//!
//! The loop:
//!
//! 1. Sends the accumulated conversation plus the tool manifest to the model
//! 2. On a tool-use stop, appends the assistant turn verbatim, runs every
//!    proposed call in order (one at a time; later calls may depend on earlier
//!    ones), and appends all results as a single user turn
//! 3. On any other stop, returns the first text block as the final answer
//! 4. Stops with [`LoopStatus::IterationCapExceeded`] if the model is still
//!    asking for tools after `max_iterations` responses
//!
//! Tool failures never abort the loop; they come back to the model as
//! `is_error` results. Model RPC failures and cancellation do abort it.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::logging::{LogEntry, SessionLogger, now_iso};
use crate::agent::tools::ToolRegistry;
use crate::error::AgentError;
use crate::model::{ContentBlock, ConversationTurn, ModelClient, ModelRequest, ModelResponse, StopReason};

// ---------------------------------------------------------------------------
// Settings / outcome
// ---------------------------------------------------------------------------

/// Per-run parameters for a [`ToolLoop`].
#[derive(Clone, Debug)]
pub struct LoopSettings {
    /// Label used in logs (sub-agent name, or "main").
    pub agent: String,
    pub model: String,
    pub system_prompt: String,
    pub max_iterations: usize,
    pub max_tokens: u32,
}

/// Terminal state of a loop run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStatus {
    /// The model stopped asking for tools.
    Completed,
    /// `max_iterations` responses all asked for tools.
    IterationCapExceeded,
}

impl LoopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopStatus::Completed => "completed",
            LoopStatus::IterationCapExceeded => "iteration_cap_exceeded",
        }
    }
}

/// Result of a loop run.
#[derive(Clone, Debug)]
pub struct LoopOutcome {
    pub status: LoopStatus,
    /// For `Completed`, the first text block of the final response. For
    /// `IterationCapExceeded`, the most recent text the model produced.
    /// `None` when there was no text.
    pub final_text: Option<String>,
    /// Model responses received.
    pub iterations: usize,
    pub tool_calls: usize,
    pub conversation: Vec<ConversationTurn>,
}

impl LoopOutcome {
    /// The final text, or an empty string.
    pub fn text(&self) -> &str {
        self.final_text.as_deref().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// ToolLoop
// ---------------------------------------------------------------------------

/// Drives a single conversation. The conversation is owned by the `run`
/// call; two runs never share one.
pub struct ToolLoop {
    client: Arc<dyn ModelClient>,
    settings: LoopSettings,
    log_dir: Option<PathBuf>,
    cancel: Option<CancellationToken>,
}

impl ToolLoop {
    pub fn new(client: Arc<dyn ModelClient>, settings: LoopSettings) -> Self {
        Self {
            client,
            settings,
            log_dir: None,
            cancel: None,
        }
    }

    /// Write a JSONL session log into `log_dir`.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Abort at the next model call (or during one) once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    /// Run the loop from `initial_user_message` against `tools`.
    pub async fn run(
        &self,
        initial_user_message: &str,
        tools: &ToolRegistry,
    ) -> Result<LoopOutcome, AgentError> {
        let mut logger = match &self.log_dir {
            Some(dir) => Some(SessionLogger::new(dir)?),
            None => None,
        };
        if let Some(log) = logger.as_mut() {
            log.log_session_start(&self.settings.agent, &self.settings.model);
        }

        let manifest = tools.definitions();
        let mut conversation = vec![ConversationTurn::user_text(initial_user_message)];
        let mut last_text: Option<String> = None;
        let mut tool_calls = 0usize;

        tracing::info!(
            agent = %self.settings.agent,
            model = %self.settings.model,
            tools = manifest.len(),
            max_iterations = self.settings.max_iterations,
            "Tool loop started"
        );

        for iteration in 1..=self.settings.max_iterations {
            let request = ModelRequest {
                model: self.settings.model.clone(),
                system_prompt: self.settings.system_prompt.clone(),
                messages: conversation.clone(),
                tools: manifest.clone(),
                max_tokens: self.settings.max_tokens,
            };

            let response = match self.call_model(request).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!(agent = %self.settings.agent, iteration, error = %e, "Model call failed");
                    if let Some(log) = logger.as_mut() {
                        log.record(&LogEntry::Error {
                            timestamp: now_iso(),
                            iteration,
                            message: e.to_string(),
                        });
                        log.log_session_end(iteration, tool_calls, "error");
                    }
                    return Err(e);
                }
            };

            let text = response.first_text().map(str::to_string);
            if let Some(ref t) = text {
                if let Some(log) = logger.as_mut() {
                    log.record(&LogEntry::AssistantText {
                        timestamp: now_iso(),
                        iteration,
                        content: t.clone(),
                    });
                }
                last_text = Some(t.clone());
            }

            // -- Owned copies of the proposed calls; the raw content goes into the
            // conversation untouched.
            let invocations: Vec<(String, String, Value)> = response
                .tool_invocations()
                .into_iter()
                .map(|inv| (inv.id.to_string(), inv.tool_name.to_string(), inv.input.clone()))
                .collect();

            let wants_tools = response.stop_reason == StopReason::ToolUse;
            conversation.push(ConversationTurn::assistant(response.content));

            if !wants_tools || invocations.is_empty() {
                if wants_tools {
                    tracing::warn!(
                        agent = %self.settings.agent,
                        iteration,
                        "Tool-use stop with no tool invocations; treating as final"
                    );
                }
                return Ok(self.finish(logger, LoopStatus::Completed, text, iteration, tool_calls, conversation));
            }

            let mut results = Vec::with_capacity(invocations.len());
            for (call_id, tool_name, input) in invocations {
                tool_calls += 1;
                tracing::debug!(agent = %self.settings.agent, iteration, tool = %tool_name, "Dispatching tool call");
                if let Some(log) = logger.as_mut() {
                    log.record(&LogEntry::ToolCall {
                        timestamp: now_iso(),
                        iteration,
                        call_id: call_id.clone(),
                        tool_name: tool_name.clone(),
                        input: input.clone(),
                    });
                }

                let outcome = tools.dispatch(&tool_name, input).await;
                if outcome.is_error {
                    tracing::warn!(tool = %tool_name, error = %outcome.payload, "Tool call failed");
                }

                if let Some(log) = logger.as_mut() {
                    log.record(&LogEntry::ToolResult {
                        timestamp: now_iso(),
                        iteration,
                        call_id: call_id.clone(),
                        tool_name,
                        result: outcome.payload.clone(),
                        is_error: outcome.is_error,
                    });
                }

                results.push(ContentBlock::ToolResult {
                    tool_invocation_id: call_id,
                    payload: outcome.payload,
                    is_error: outcome.is_error,
                });
            }
            conversation.push(ConversationTurn::tool_results(results));
        }

        tracing::warn!(
            agent = %self.settings.agent,
            max_iterations = self.settings.max_iterations,
            "Tool loop hit the iteration cap"
        );
        let iterations = self.settings.max_iterations;
        Ok(self.finish(
            logger,
            LoopStatus::IterationCapExceeded,
            last_text,
            iterations,
            tool_calls,
            conversation,
        ))
    }

    async fn call_model(&self, request: ModelRequest) -> Result<ModelResponse, AgentError> {
        match &self.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(AgentError::Cancelled);
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(AgentError::Cancelled),
                    result = self.client.complete(request) => result.map_err(AgentError::from),
                }
            }
            None => self.client.complete(request).await.map_err(AgentError::from),
        }
    }

    fn finish(
        &self,
        logger: Option<SessionLogger>,
        status: LoopStatus,
        final_text: Option<String>,
        iterations: usize,
        tool_calls: usize,
        conversation: Vec<ConversationTurn>,
    ) -> LoopOutcome {
        if let Some(mut log) = logger {
            log.log_session_end(iterations, tool_calls, status.as_str());
        }
        tracing::info!(
            agent = %self.settings.agent,
            status = status.as_str(),
            iterations,
            tool_calls,
            "Tool loop finished"
        );
        LoopOutcome {
            status,
            final_text,
            iterations,
            tool_calls,
            conversation,
        }
    }
}
