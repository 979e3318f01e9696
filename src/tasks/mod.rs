//! Task list state: the validated store, its JSON persistence, display
//! refresh, and the tools that let a model mutate it.

pub mod display;
pub mod persistence;
pub mod store;
pub mod tools;

pub use display::{ConsoleTaskRenderer, TaskObserver};
pub use persistence::{JsonFilePersistence, NoPersistence, TaskPersistence};
pub use store::{Task, TaskDraft, TaskListStore, TaskStats, TaskStatus, ValidationError};
pub use tools::{TaskStatusTool, TodoWriteTool};
