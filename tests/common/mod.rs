#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use baton::error::ModelError;
use baton::model::{ContentBlock, ModelClient, ModelRequest, ModelResponse, StopReason};

// ─── Response builders ────────────────────────────────────────────────

pub fn text_reply(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
    }
}

/// A tool-use response proposing `calls` as `(id, tool, input)`.
pub fn tool_reply(text: Option<&str>, calls: &[(&str, &str, Value)]) -> ModelResponse {
    let mut content = Vec::new();
    if let Some(t) = text {
        content.push(ContentBlock::text(t));
    }
    for (id, tool, input) in calls {
        content.push(ContentBlock::ToolInvocation {
            id: id.to_string(),
            tool_name: tool.to_string(),
            input: input.clone(),
        });
    }
    ModelResponse {
        content,
        stop_reason: StopReason::ToolUse,
    }
}

/// What the fake does for one request.
pub struct Reply {
    pub delay: Duration,
    pub result: Result<ModelResponse, ModelError>,
}

impl Reply {
    pub fn ok(response: ModelResponse) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(response),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::ok(text_reply(text))
    }

    pub fn err(error: ModelError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Box<dyn Fn(&ModelRequest) -> Reply + Send + Sync>;

/// A `ModelClient` that answers from a script and records every request.
///
/// `scripted` replays replies in call order. `routed` computes each reply
/// from the request, which keeps concurrent branches deterministic.
pub struct FakeModel {
    queue: Mutex<VecDeque<Reply>>,
    handler: Option<Handler>,
    requests: Mutex<Vec<ModelRequest>>,
    completions: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn scripted(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(replies.into()),
            handler: None,
            requests: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        })
    }

    pub fn routed(handler: impl Fn(&ModelRequest) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            requests: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// System prompts in the order their replies were delivered.
    pub fn completion_order(&self) -> Vec<String> {
        self.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for FakeModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = match &self.handler {
            Some(handler) => handler(&request),
            None => self
                .queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Reply::err(ModelError::InvalidResponse("script exhausted".into()))),
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.completions.lock().unwrap().push(request.system_prompt.clone());
        reply.result
    }
}

/// The user text of the first turn of a request.
pub fn first_user_text(request: &ModelRequest) -> String {
    request
        .messages
        .first()
        .and_then(|turn| turn.content.first())
        .and_then(ContentBlock::as_text)
        .unwrap_or_default()
        .to_string()
}
