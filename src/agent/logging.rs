//! JSONL session logger for full session replay.
//!
//! Writes structured events to timestamped JSONL files in the configured log
//! directory. Each tool-loop session produces a file named
//! `session-{ISO8601}-{id}.jsonl`; the short id keeps concurrently running
//! sub-agents from sharing a file.
//!
//! Uses synchronous `std::fs` since writes are small, buffered, and flushed
//! after each event -- no async complexity needed for append-only logging.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::error::AgentError;

/// Returns the current UTC time as an ISO 8601 string with milliseconds.
pub fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// A structured log entry serialized as a single JSON line.
///
/// Tagged with `event_type` so each line is self-describing for replay.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type")]
pub enum LogEntry {
    #[serde(rename = "session_start")]
    SessionStart {
        timestamp: String,
        session_id: String,
        agent: String,
        model: String,
    },

    /// Text the model produced in a response.
    #[serde(rename = "assistant_text")]
    AssistantText {
        timestamp: String,
        iteration: usize,
        content: String,
    },

    #[serde(rename = "tool_call")]
    ToolCall {
        timestamp: String,
        iteration: usize,
        call_id: String,
        tool_name: String,
        input: serde_json::Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        timestamp: String,
        iteration: usize,
        call_id: String,
        tool_name: String,
        result: String,
        is_error: bool,
    },

    #[serde(rename = "error")]
    Error {
        timestamp: String,
        iteration: usize,
        message: String,
    },

    #[serde(rename = "session_end")]
    SessionEnd {
        timestamp: String,
        iterations: usize,
        tool_calls: usize,
        status: String,
    },
}

/// Append-only JSONL logger for tool-loop sessions.
pub struct SessionLogger {
    writer: BufWriter<fs::File>,
    log_path: PathBuf,
    session_id: String,
}

impl SessionLogger {
    /// Create a new session log file inside `log_dir`, creating the
    /// directory if needed.
    pub fn new(log_dir: &Path) -> Result<Self, AgentError> {
        fs::create_dir_all(log_dir).map_err(|e| {
            AgentError::LoggingError(format!("cannot create {}: {e}", log_dir.display()))
        })?;

        let session_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let log_path = log_dir.join(format!("session-{stamp}-{session_id}.jsonl"));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| {
                AgentError::LoggingError(format!("cannot open {}: {e}", log_path.display()))
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            log_path,
            session_id,
        })
    }

    /// Serialize a log entry as a single JSON line and flush.
    pub fn log_event(&mut self, event: &LogEntry) -> Result<(), AgentError> {
        let write = |writer: &mut BufWriter<fs::File>| -> std::io::Result<()> {
            serde_json::to_writer(&mut *writer, event)?;
            writer.write_all(b"\n")?;
            writer.flush()
        };
        write(&mut self.writer).map_err(|e| AgentError::LoggingError(e.to_string()))
    }

    /// Like [`log_event`](Self::log_event), but a write failure is only
    /// reported through tracing.
    pub fn record(&mut self, event: &LogEntry) {
        if let Err(e) = self.log_event(event) {
            tracing::warn!(path = %self.log_path.display(), error = %e, "Session log write failed");
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_session_start(&mut self, agent: &str, model: &str) {
        let entry = LogEntry::SessionStart {
            timestamp: now_iso(),
            session_id: self.session_id.clone(),
            agent: agent.to_string(),
            model: model.to_string(),
        };
        self.record(&entry);
    }

    pub fn log_session_end(&mut self, iterations: usize, tool_calls: usize, status: &str) {
        self.record(&LogEntry::SessionEnd {
            timestamp: now_iso(),
            iterations,
            tool_calls,
            status: status.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use tempfile::TempDir;

    fn make_logger() -> (SessionLogger, TempDir) {
        let tmp = TempDir::new().expect("tempdir");
        let logger = SessionLogger::new(&tmp.path().join("logs")).expect("SessionLogger::new");
        (logger, tmp)
    }

    fn read_lines(logger: &SessionLogger) -> Vec<serde_json::Value> {
        let file = fs::File::open(logger.log_path()).expect("open log");
        std::io::BufReader::new(file)
            .lines()
            .map(|l| serde_json::from_str(&l.unwrap()).expect("valid JSON"))
            .collect()
    }

    #[test]
    fn creates_log_file_in_log_dir() {
        let (logger, tmp) = make_logger();
        let log_path = logger.log_path().to_owned();

        assert!(log_path.exists(), "log file should exist at {log_path:?}");
        assert!(log_path.starts_with(tmp.path().join("logs")));

        let name = log_path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("session-"));
        assert!(name.ends_with(&format!("-{}.jsonl", logger.session_id())));
    }

    #[test]
    fn two_loggers_in_same_second_get_distinct_files() {
        let tmp = TempDir::new().unwrap();
        let a = SessionLogger::new(tmp.path()).unwrap();
        let b = SessionLogger::new(tmp.path()).unwrap();
        assert_ne!(a.log_path(), b.log_path());
    }

    #[test]
    fn session_events_round_trip_as_jsonl() {
        let (mut logger, _tmp) = make_logger();

        logger.log_session_start("planner", "claude-test");
        logger.record(&LogEntry::ToolCall {
            timestamp: now_iso(),
            iteration: 1,
            call_id: "call_001".to_string(),
            tool_name: "todo_write".to_string(),
            input: serde_json::json!({"todos": []}),
        });
        logger.record(&LogEntry::ToolResult {
            timestamp: now_iso(),
            iteration: 1,
            call_id: "call_001".to_string(),
            tool_name: "todo_write".to_string(),
            result: "Error: Task list must not be empty".to_string(),
            is_error: false,
        });
        logger.log_session_end(1, 1, "completed");

        let lines = read_lines(&logger);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["event_type"], "session_start");
        assert_eq!(lines[0]["agent"], "planner");
        assert_eq!(lines[1]["tool_name"], "todo_write");
        assert_eq!(lines[2]["is_error"], false);
        assert_eq!(lines[3]["event_type"], "session_end");
        assert_eq!(lines[3]["status"], "completed");
    }
}
