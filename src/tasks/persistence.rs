//! Durable storage for the task list: one JSON document holding the full list.
//!
//! Uses synchronous `std::fs`; the document is small and written once per
//! update.

use std::fs;
use std::path::{Path, PathBuf};

use super::store::Task;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed task file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load/save contract for the task list.
pub trait TaskPersistence: Send + Sync {
    fn load(&self) -> Result<Vec<Task>, PersistenceError>;
    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError>;
}

/// Keeps nothing. Loads as empty.
pub struct NoPersistence;

impl TaskPersistence for NoPersistence {
    fn load(&self) -> Result<Vec<Task>, PersistenceError> {
        Ok(Vec::new())
    }

    fn save(&self, _tasks: &[Task]) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Stores the list as pretty-printed JSON at `path`.
///
/// Saves write a sibling temp file and rename it over the target. An
/// interrupted save leaves either the old or the new document, never a
/// truncated one; it can still leave a stray `.tmp` file.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl TaskPersistence for JsonFilePersistence {
    /// A missing file is an empty list, not an error.
    fn load(&self) -> Result<Vec<Task>, PersistenceError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No task file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        serde_json::from_str(&contents).map_err(|source| PersistenceError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let json = serde_json::to_string_pretty(tasks).map_err(|source| PersistenceError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }
}
