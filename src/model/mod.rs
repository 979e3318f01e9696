//! Request/response vocabulary for the language-model RPC and the
//! [`ModelClient`] seam every component is constructed with.
//!
//! The model itself is an opaque collaborator: one request in, one response
//! out. [`genai_client::GenaiModelClient`] is the production implementation;
//! [`retry::RetryingModelClient`] layers bounded retry and per-call timeouts
//! on top of any client.

pub mod genai_client;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::tools::ToolDefinition;
use crate::error::ModelError;

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One block of turn content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolInvocation {
        id: String,
        tool_name: String,
        input: Value,
    },
    ToolResult {
        tool_invocation_id: String,
        payload: String,
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single entry in an append-only conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ConversationTurn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// A user turn carrying one tool-result block per invocation, in order.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }
}

/// Why the model stopped producing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    StopSequence,
}

#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: String,
    pub messages: Vec<ConversationTurn>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: u32,
}

impl ModelRequest {
    /// A tool-less single-turn request.
    pub fn one_shot(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            messages: vec![ConversationTurn::user_text(prompt)],
            tools: Vec::new(),
            max_tokens,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

/// A tool call proposed by the model, borrowed out of a response.
#[derive(Clone, Copy, Debug)]
pub struct ToolInvocation<'a> {
    pub id: &'a str,
    pub tool_name: &'a str,
    pub input: &'a Value,
}

impl ModelResponse {
    /// The first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }

    /// Every tool-invocation block, in the order the model emitted them.
    pub fn tool_invocations(&self) -> Vec<ToolInvocation<'_>> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolInvocation {
                    id,
                    tool_name,
                    input,
                } => Some(ToolInvocation {
                    id,
                    tool_name,
                    input,
                }),
                _ => None,
            })
            .collect()
    }
}

/// The language-model RPC. Implementations must be safe to share across
/// concurrently running sub-agents.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}

/// Run a one-shot request and return its first text block, or an empty
/// string if the model produced none.
pub async fn complete_text(
    client: &dyn ModelClient,
    request: ModelRequest,
) -> Result<String, ModelError> {
    let response = client.complete(request).await?;
    Ok(response.first_text().unwrap_or_default().to_string())
}
