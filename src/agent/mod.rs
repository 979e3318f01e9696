//! Single-agent machinery: the tool registry, the tool invocation loop, and
//! its JSONL session log.

pub mod logging;
pub mod tool_loop;
pub mod tools;

pub use tool_loop::{LoopOutcome, LoopSettings, LoopStatus, ToolLoop};
pub use tools::{Tool, ToolDefinition, ToolOutcome, ToolRegistry};
