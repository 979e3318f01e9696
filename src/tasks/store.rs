//! Validated, all-or-nothing task list.
//!
//! Every update submits the whole ordered list. The candidate is validated in
//! full under the write lock and only then replaces the stored list, so a
//! failed update never leaves a partial change behind. Persistence and
//! display refresh run after the swap and are best-effort.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::display::TaskObserver;
use super::persistence::{NoPersistence, TaskPersistence};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// An accepted task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Imperative description, e.g. "Run the tests".
    pub content: String,
    pub status: TaskStatus,
    /// Progressive label, e.g. "Running the tests".
    #[serde(rename = "activeForm")]
    pub active_form: String,
}

impl Task {
    pub fn new(content: impl Into<String>, status: TaskStatus, active_form: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status,
            active_form: active_form.into(),
        }
    }
}

/// A task as submitted, before validation. `status` stays a string so an
/// out-of-range value can be reported with its index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "activeForm", default)]
    pub active_form: String,
}

impl TaskDraft {
    pub fn new(content: impl Into<String>, status: impl Into<String>, active_form: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: status.into(),
            active_form: active_form.into(),
        }
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        TaskDraft::new(&task.content, task.status.as_str(), &task.active_form)
    }
}

/// Why a candidate list was rejected. Indices are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Task list must not be empty")]
    EmptyList,

    #[error("Only one task may be in_progress at a time (found {count})")]
    MultipleInProgress { count: usize },

    #[error("Task {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("Task {index} has invalid status `{value}` (expected pending, in_progress, or completed)")]
    InvalidStatus { index: usize, value: String },
}

/// Counts over the current list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub progress_percent: u32,
}

impl TaskStats {
    pub fn of(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let total = tasks.len();
        let completed = count(TaskStatus::Completed);
        let progress_percent = if total == 0 {
            0
        } else {
            (100.0 * completed as f64 / total as f64).round() as u32
        };
        Self {
            total,
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completed,
            progress_percent,
        }
    }
}

/// Check a candidate list against the store's rules, in order; the first
/// failing rule wins.
pub fn validate(candidate: &[TaskDraft]) -> Result<Vec<Task>, ValidationError> {
    if candidate.is_empty() {
        return Err(ValidationError::EmptyList);
    }

    let in_progress = candidate
        .iter()
        .filter(|t| t.status == TaskStatus::InProgress.as_str())
        .count();
    if in_progress > 1 {
        return Err(ValidationError::MultipleInProgress { count: in_progress });
    }

    for (i, draft) in candidate.iter().enumerate() {
        if draft.content.trim().is_empty() {
            return Err(ValidationError::MissingField {
                index: i + 1,
                field: "content",
            });
        }
        if draft.active_form.trim().is_empty() {
            return Err(ValidationError::MissingField {
                index: i + 1,
                field: "activeForm",
            });
        }
    }

    candidate
        .iter()
        .enumerate()
        .map(|(i, draft)| {
            let status = TaskStatus::parse(&draft.status).ok_or_else(|| ValidationError::InvalidStatus {
                index: i + 1,
                value: draft.status.clone(),
            })?;
            Ok(Task {
                content: draft.content.clone(),
                status,
                active_form: draft.active_form.clone(),
            })
        })
        .collect()
}

/// Shared handle to the task list. Clones see the same list.
///
/// Reads take a shared lock; `update` holds the write lock across
/// validate-then-replace so concurrent writers are serialized.
#[derive(Clone)]
pub struct TaskListStore {
    tasks: Arc<RwLock<Vec<Task>>>,
    persistence: Arc<dyn TaskPersistence>,
    observers: Arc<RwLock<Vec<Arc<dyn TaskObserver>>>>,
}

impl Default for TaskListStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TaskListStore {
    /// A store with no durable backing.
    pub fn in_memory() -> Self {
        Self::with_tasks(Vec::new(), Arc::new(NoPersistence))
    }

    /// Open a store backed by `persistence`, seeding it with whatever the
    /// backend can load. A load failure starts from an empty list.
    pub fn open(persistence: Arc<dyn TaskPersistence>) -> Self {
        let tasks = match persistence.load() {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "Loaded task list");
                tasks
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load task list, starting empty");
                Vec::new()
            }
        };
        Self::with_tasks(tasks, persistence)
    }

    fn with_tasks(tasks: Vec<Task>, persistence: Arc<dyn TaskPersistence>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(tasks)),
            persistence,
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an observer notified after every successful update.
    pub fn subscribe(&self, observer: Arc<dyn TaskObserver>) {
        self.observers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }

    /// Validate `candidate` in full and, if valid, replace the stored list.
    pub fn update(&self, candidate: &[TaskDraft]) -> Result<TaskStats, ValidationError> {
        let (snapshot, stats) = {
            let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
            let accepted = validate(candidate)?;
            let stats = TaskStats::of(&accepted);
            *tasks = accepted;

            // Persist while still holding the write lock so the file order
            // matches the update order.
            if let Err(e) = self.persistence.save(&tasks) {
                tracing::warn!(error = %e, "Failed to persist task list; in-memory list remains authoritative");
            }
            (tasks.clone(), stats)
        };

        tracing::info!(
            total = stats.total,
            completed = stats.completed,
            in_progress = stats.in_progress,
            progress = stats.progress_percent,
            "Task list updated"
        );

        let observers = self.observers.read().unwrap_or_else(|e| e.into_inner()).clone();
        for observer in observers {
            observer.tasks_changed(&snapshot, &stats);
        }

        Ok(stats)
    }

    /// Snapshot of the full list.
    pub fn get_all(&self) -> Vec<Task> {
        self.read().clone()
    }

    pub fn get_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.read()
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect()
    }

    pub fn get_in_progress(&self) -> Option<Task> {
        self.read()
            .iter()
            .find(|t| t.status == TaskStatus::InProgress)
            .cloned()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::of(&self.read())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Task>> {
        self.tasks.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(content: &str, status: &str, active: &str) -> TaskDraft {
        TaskDraft::new(content, status, active)
    }

    #[test]
    fn empty_list_is_rejected() {
        let store = TaskListStore::in_memory();
        assert_eq!(store.update(&[]), Err(ValidationError::EmptyList));
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn two_in_progress_is_rejected_and_store_unchanged() {
        let store = TaskListStore::in_memory();
        store.update(&[draft("a", "pending", "A-ing")]).unwrap();
        let before = store.get_all();

        let err = store
            .update(&[
                draft("a", "in_progress", "A-ing"),
                draft("b", "in_progress", "B-ing"),
            ])
            .unwrap_err();
        assert_eq!(err, ValidationError::MultipleInProgress { count: 2 });
        assert_eq!(store.get_all(), before);
    }

    #[test]
    fn in_progress_count_is_checked_before_fields() {
        // Rule 2 fires even though task 1 is also missing its content.
        let err = validate(&[
            draft("  ", "in_progress", "A-ing"),
            draft("b", "in_progress", "B-ing"),
        ])
        .unwrap_err();
        assert_eq!(err, ValidationError::MultipleInProgress { count: 2 });
    }

    #[test]
    fn whitespace_fields_are_missing() {
        let err = validate(&[draft("a", "pending", "A-ing"), draft("b", "pending", "   ")]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                index: 2,
                field: "activeForm"
            }
        );

        let err = validate(&[draft("\t", "pending", "A-ing")]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                index: 1,
                field: "content"
            }
        );
    }

    #[test]
    fn invalid_status_names_index_and_value() {
        let err = validate(&[draft("a", "pending", "A-ing"), draft("b", "done", "B-ing")]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidStatus {
                index: 2,
                value: "done".into()
            }
        );
    }

    #[test]
    fn completing_the_only_task_reports_full_progress() {
        let store = TaskListStore::in_memory();
        store.update(&[draft("a", "pending", "A-ing")]).unwrap();
        store.update(&[draft("a", "completed", "A-ing")]).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.progress_percent, 100);
    }

    #[test]
    fn progress_is_rounded() {
        let tasks = vec![
            Task::new("a", TaskStatus::Completed, "A-ing"),
            Task::new("b", TaskStatus::Completed, "B-ing"),
            Task::new("c", TaskStatus::Pending, "C-ing"),
        ];
        assert_eq!(TaskStats::of(&tasks).progress_percent, 67);
        assert_eq!(TaskStats::of(&[]).progress_percent, 0);
    }

    #[test]
    fn repeated_update_is_idempotent() {
        let store = TaskListStore::in_memory();
        let list = [
            draft("a", "completed", "A-ing"),
            draft("b", "in_progress", "B-ing"),
            draft("c", "pending", "C-ing"),
        ];
        let first = store.update(&list).unwrap();
        let after_first = store.get_all();
        let second = store.update(&list).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.get_all(), after_first);
    }

    #[test]
    fn queries_filter_and_preserve_order() {
        let store = TaskListStore::in_memory();
        store
            .update(&[
                draft("one", "pending", "One-ing"),
                draft("two", "in_progress", "Two-ing"),
                draft("three", "pending", "Three-ing"),
            ])
            .unwrap();

        let pending: Vec<_> = store
            .get_by_status(TaskStatus::Pending)
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(pending, vec!["one", "three"]);
        assert_eq!(store.get_in_progress().unwrap().content, "two");
    }

    #[test]
    fn get_all_is_a_copy() {
        let store = TaskListStore::in_memory();
        store.update(&[draft("a", "pending", "A-ing")]).unwrap();
        let mut copy = store.get_all();
        copy[0].content = "mutated".into();
        copy.clear();
        assert_eq!(store.get_all()[0].content, "a");
    }

    #[test]
    fn clones_share_state() {
        let store = TaskListStore::in_memory();
        let other = store.clone();
        store.update(&[draft("a", "pending", "A-ing")]).unwrap();
        assert_eq!(other.get_all().len(), 1);
    }

    #[test]
    fn concurrent_updates_leave_exactly_one_submitted_list() {
        let store = TaskListStore::in_memory();
        let lists: Vec<Vec<TaskDraft>> = (0..8)
            .map(|n| {
                (0..=n)
                    .map(|i| {
                        let status = if i == n { "in_progress" } else { "completed" };
                        draft(&format!("task {n}.{i}"), status, &format!("doing {n}.{i}"))
                    })
                    .collect()
            })
            .collect();

        std::thread::scope(|scope| {
            for list in &lists {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..50 {
                        store.update(list).unwrap();
                    }
                });
            }
        });

        let finished: Vec<TaskDraft> = store.get_all().iter().map(TaskDraft::from).collect();
        assert!(lists.contains(&finished));
        assert_eq!(store.get_by_status(TaskStatus::InProgress).len(), 1);
        assert_eq!(store.stats().total, finished.len());
    }
}
