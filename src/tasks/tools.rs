//! Tools that expose the task store to a model: `todo_write` (full-list
//! replace) and `task_status` (read-only snapshot).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::store::{TaskDraft, TaskListStore};
use crate::agent::tools::{Tool, ToolDefinition};
use crate::error::ToolError;

pub const TODO_WRITE: &str = "todo_write";
pub const TASK_STATUS: &str = "task_status";

/// System prompt for a single agent working through a task list.
pub const TASK_AGENT_PROMPT: &str = "You are a capable assistant working through a multi-step \
request. Before starting, break the work into tasks with the todo_write tool. Keep exactly one \
task in_progress while you work, and send the complete, updated list with todo_write each time a \
task starts or finishes. When every task is completed, reply with the final result as plain text \
without calling any tool.";

#[derive(Debug, Deserialize)]
pub struct TodoWriteInput {
    pub todos: Vec<TaskDraft>,
}

/// Replaces the whole task list. Always answers with a string: a status
/// line on success, an `Error: ...` line on a rejected list.
pub struct TodoWriteTool {
    store: TaskListStore,
}

impl TodoWriteTool {
    pub fn new(store: TaskListStore) -> Self {
        Self { store }
    }

    /// Apply an update and describe the outcome for the model.
    pub fn apply(&self, todos: &[TaskDraft]) -> String {
        match self.store.update(todos) {
            Ok(stats) => format!(
                "Task list updated: {}/{} completed ({}%), {} in progress, {} pending",
                stats.completed, stats.total, stats.progress_percent, stats.in_progress, stats.pending
            ),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected todo_write update");
                format!("Error: {e}")
            }
        }
    }
}

#[async_trait]
impl Tool for TodoWriteTool {
    type Input = TodoWriteInput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TODO_WRITE.to_string(),
            description: "Create or replace the task list for the current work. Always send the \
                          complete list: it replaces the previous one. Exactly one task should be \
                          in_progress while work is underway; mark tasks completed as soon as \
                          they are done."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "todos": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "content": {
                                    "type": "string",
                                    "minLength": 1,
                                    "description": "Imperative description, e.g. \"Run the tests\""
                                },
                                "status": {
                                    "type": "string",
                                    "enum": ["pending", "in_progress", "completed"]
                                },
                                "activeForm": {
                                    "type": "string",
                                    "minLength": 1,
                                    "description": "Present-progressive label, e.g. \"Running the tests\""
                                }
                            },
                            "required": ["content", "status", "activeForm"]
                        }
                    }
                },
                "required": ["todos"]
            }),
        }
    }

    async fn call(&self, input: TodoWriteInput) -> Result<Value, ToolError> {
        Ok(Value::String(self.apply(&input.todos)))
    }
}

/// Takes no input; returns the current tasks and counts as JSON.
pub struct TaskStatusTool {
    store: TaskListStore,
}

impl TaskStatusTool {
    pub fn new(store: TaskListStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TaskStatusTool {
    type Input = Value;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: TASK_STATUS.to_string(),
            description: "Show the current task list with completion statistics.".to_string(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn call(&self, _input: Value) -> Result<Value, ToolError> {
        Ok(json!({
            "tasks": self.store.get_all(),
            "stats": self.store.stats(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::ToolRegistry;

    fn registry(store: &TaskListStore) -> ToolRegistry {
        ToolRegistry::new()
            .with_tool(TodoWriteTool::new(store.clone()))
            .with_tool(TaskStatusTool::new(store.clone()))
    }

    #[tokio::test]
    async fn todo_write_reports_stats() {
        let store = TaskListStore::in_memory();
        let outcome = registry(&store)
            .dispatch(
                TODO_WRITE,
                json!({"todos": [
                    {"content": "a", "status": "completed", "activeForm": "A-ing"},
                    {"content": "b", "status": "in_progress", "activeForm": "B-ing"}
                ]}),
            )
            .await;
        assert!(!outcome.is_error);
        assert_eq!(
            outcome.payload,
            "Task list updated: 1/2 completed (50%), 1 in progress, 0 pending"
        );
        assert_eq!(store.get_all().len(), 2);
    }

    #[tokio::test]
    async fn todo_write_validation_failure_is_a_string_not_an_error() {
        let store = TaskListStore::in_memory();
        let outcome = registry(&store)
            .dispatch(TODO_WRITE, json!({"todos": []}))
            .await;
        assert!(!outcome.is_error);
        assert!(outcome.payload.starts_with("Error: "));
        assert!(outcome.payload.contains("must not be empty"));
    }

    #[tokio::test]
    async fn todo_write_reports_bad_status_value() {
        let store = TaskListStore::in_memory();
        let outcome = registry(&store)
            .dispatch(
                TODO_WRITE,
                json!({"todos": [{"content": "a", "status": "blocked", "activeForm": "A-ing"}]}),
            )
            .await;
        assert!(outcome.payload.contains("invalid status `blocked`"));
    }

    #[tokio::test]
    async fn task_status_returns_snapshot() {
        let store = TaskListStore::in_memory();
        store
            .update(&[TaskDraft::new("a", "pending", "A-ing")])
            .unwrap();
        let outcome = registry(&store).dispatch(TASK_STATUS, json!({})).await;
        let parsed: Value = serde_json::from_str(&outcome.payload).unwrap();
        assert_eq!(parsed["stats"]["total"], 1);
        assert_eq!(parsed["tasks"][0]["activeForm"], "A-ing");
    }
}
