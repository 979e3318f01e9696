//! Tool schema definitions, the typed [`Tool`] trait, and the registry the
//! tool loop dispatches through.
//!
//! Input is parsed exactly once, at the dispatch boundary, into the tool's
//! own `Input` type. Handlers never see raw JSON.
//!
//! Dispatch never returns `Err`: unknown tools, malformed input, and handler
//! failures all come back as a [`ToolOutcome`] with `is_error = true` so the
//! model can observe the failure and react.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// Name, description, and JSON schema of a tool as advertised to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A tool the model may call.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// The typed shape of the tool's input.
    type Input: DeserializeOwned + Send;

    fn definition(&self) -> ToolDefinition;

    async fn call(&self, input: Self::Input) -> Result<Value, ToolError>;
}

/// Object-safe form of [`Tool`] that owns the parse step.
trait DynTool: Send + Sync {
    fn invoke(&self, name: String, raw: Value) -> BoxFuture<'_, Result<Value, ToolError>>;
}

impl<T: Tool> DynTool for T {
    fn invoke(&self, name: String, raw: Value) -> BoxFuture<'_, Result<Value, ToolError>> {
        Box::pin(async move {
            let input: T::Input =
                serde_json::from_value(raw).map_err(|e| ToolError::InvalidInput {
                    tool: name,
                    message: e.to_string(),
                })?;
            self.call(input).await
        })
    }
}

#[derive(Clone)]
struct Entry {
    definition: ToolDefinition,
    tool: Arc<dyn DynTool>,
}

/// Result of one tool dispatch, ready to become a tool-result block.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutcome {
    pub payload: String,
    pub is_error: bool,
}

impl ToolOutcome {
    fn from_error(error: &ToolError) -> Self {
        Self {
            payload: error.to_string(),
            is_error: true,
        }
    }
}

/// Ordered set of tools keyed by name. Cheap to clone; handlers are shared.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<Entry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A tool with the same name replaces the earlier one in
    /// place, keeping its position in the manifest.
    pub fn register<T: Tool>(&mut self, tool: T) {
        let definition = tool.definition();
        let entry = Entry {
            definition,
            tool: Arc::new(tool),
        };
        match self
            .entries
            .iter_mut()
            .find(|e| e.definition.name == entry.definition.name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    /// Tool manifest in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(|e| e.definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.definition.name.clone())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.definition.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A registry restricted to `allowed`. Names with no registered tool
    /// are ignored.
    pub fn filtered(&self, allowed: &HashSet<String>) -> ToolRegistry {
        ToolRegistry {
            entries: self
                .entries
                .iter()
                .filter(|e| allowed.contains(&e.definition.name))
                .cloned()
                .collect(),
        }
    }

    /// Dispatch a tool call by name.
    pub async fn dispatch(&self, name: &str, input: Value) -> ToolOutcome {
        let Some(entry) = self.entries.iter().find(|e| e.definition.name == name) else {
            return ToolOutcome::from_error(&ToolError::UnknownTool(name.to_string()));
        };

        match entry.tool.invoke(name.to_string(), input).await {
            Ok(Value::String(text)) => ToolOutcome {
                payload: text,
                is_error: false,
            },
            Ok(value) => ToolOutcome {
                payload: value.to_string(),
                is_error: false,
            },
            Err(e) => ToolOutcome::from_error(&e),
        }
    }
}
