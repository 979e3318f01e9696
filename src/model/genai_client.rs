//! [`ModelClient`] backed by the `genai` multi-provider client.
//!
//! Provider selection is by model name (e.g. `claude-*` routes to Anthropic,
//! `gpt-*` to OpenAI, un-prefixed names to Ollama). Credentials come from the
//! provider's usual environment variables, read by genai itself.

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, Tool, ToolCall, ToolResponse};
use serde_json::Value;

use super::{ContentBlock, ConversationTurn, ModelClient, ModelRequest, ModelResponse, Role, StopReason};
use crate::agent::tools::ToolDefinition;
use crate::error::ModelError;

/// Production model client. Cheap to clone; share one instance via `Arc`.
#[derive(Clone, Default)]
pub struct GenaiModelClient {
    client: Client,
}

impl GenaiModelClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelClient for GenaiModelClient {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let options = ChatOptions::default().with_max_tokens(request.max_tokens);
        let chat_req = build_chat_request(&request);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .exec_chat(&request.model, chat_req, Some(&options))
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let mut content = Vec::new();
        if let Some(text) = response.first_text() {
            content.push(ContentBlock::text(text));
        }
        let calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
        let stop_reason = if calls.is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };
        for call in calls {
            content.push(to_invocation(call)?);
        }

        Ok(ModelResponse {
            content,
            stop_reason,
        })
    }
}

/// Turn a provider tool call into an invocation block. Arguments must be a
/// JSON object; `null` means no arguments and a string is parsed as JSON.
fn to_invocation(call: ToolCall) -> Result<ContentBlock, ModelError> {
    let ToolCall {
        call_id,
        fn_name,
        fn_arguments,
        ..
    } = call;
    let input = match fn_arguments {
        Value::Object(map) => Value::Object(map),
        Value::Null => Value::Object(Default::default()),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => {
                return Err(ModelError::InvalidResponse(format!(
                    "arguments for tool call `{fn_name}` are not a JSON object: {raw}"
                )));
            }
        },
        other => {
            return Err(ModelError::InvalidResponse(format!(
                "arguments for tool call `{fn_name}` are not a JSON object: {other}"
            )));
        }
    };
    Ok(ContentBlock::ToolInvocation {
        id: call_id,
        tool_name: fn_name,
        input,
    })
}

fn build_chat_request(request: &ModelRequest) -> ChatRequest {
    let mut chat_req = ChatRequest::from_system(&request.system_prompt);
    if !request.tools.is_empty() {
        chat_req = chat_req.with_tools(request.tools.iter().map(to_genai_tool).collect::<Vec<_>>());
    }
    for turn in &request.messages {
        for message in to_chat_messages(turn) {
            chat_req = chat_req.append_message(message);
        }
    }
    chat_req
}

fn to_genai_tool(def: &ToolDefinition) -> Tool {
    Tool::new(def.name.clone())
        .with_description(def.description.clone())
        .with_schema(def.input_schema.clone())
}

/// Map one turn onto genai messages. An assistant turn that proposes tools
/// becomes a single tool-call message; each tool result becomes its own
/// tool-response message.
fn to_chat_messages(turn: &ConversationTurn) -> Vec<ChatMessage> {
    let text: String = turn
        .content
        .iter()
        .filter_map(ContentBlock::as_text)
        .collect::<Vec<_>>()
        .join("\n");

    let calls: Vec<ToolCall> = turn
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolInvocation {
                id,
                tool_name,
                input,
            } => Some(ToolCall {
                call_id: id.clone(),
                fn_name: tool_name.clone(),
                fn_arguments: input.clone(),
                thought_signatures: None,
            }),
            _ => None,
        })
        .collect();

    let responses: Vec<ChatMessage> = turn
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolResult {
                tool_invocation_id,
                payload,
                is_error,
            } => {
                let content = if *is_error && !payload.starts_with("Error") {
                    format!("Error: {payload}")
                } else {
                    payload.clone()
                };
                Some(ToolResponse::new(tool_invocation_id.clone(), content).into())
            }
            _ => None,
        })
        .collect();

    match turn.role {
        Role::Assistant if !calls.is_empty() => vec![ChatMessage::from(calls)],
        Role::Assistant => vec![ChatMessage::assistant(text)],
        Role::User if !responses.is_empty() => responses,
        Role::User => vec![ChatMessage::user(text)],
    }
}
