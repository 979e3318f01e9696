//! Display refresh for the task list.

use super::store::{Task, TaskStats, TaskStatus};

/// Notified after each successful task list update.
pub trait TaskObserver: Send + Sync {
    fn tasks_changed(&self, tasks: &[Task], stats: &TaskStats);
}

/// Prints the checklist to stderr (stdout is reserved for answers).
pub struct ConsoleTaskRenderer;

impl TaskObserver for ConsoleTaskRenderer {
    fn tasks_changed(&self, tasks: &[Task], stats: &TaskStats) {
        eprintln!("{}", render_task_list(tasks, stats));
    }
}

const BAR_WIDTH: usize = 20;

/// Render a checklist with a progress bar header.
///
/// ```text
/// Tasks [##########----------] 50% (1/2)
///   [x] Write the parser
///   [>] Running the tests
/// ```
pub fn render_task_list(tasks: &[Task], stats: &TaskStats) -> String {
    let filled = (stats.progress_percent as usize * BAR_WIDTH) / 100;
    let mut out = format!(
        "Tasks [{}{}] {}% ({}/{})",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        stats.progress_percent,
        stats.completed,
        stats.total,
    );
    for task in tasks {
        let line = match task.status {
            TaskStatus::Completed => format!("[x] {}", task.content),
            TaskStatus::InProgress => format!("[>] {}", task.active_form),
            TaskStatus::Pending => format!("[ ] {}", task.content),
        };
        out.push_str("\n  ");
        out.push_str(&line);
    }
    out
}
