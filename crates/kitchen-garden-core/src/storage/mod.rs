mod config;
pub mod database;
pub mod memory;

pub use config::{ClipboardConfig, Config, PomodoroConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clipboard::ClipboardEntry;
use crate::error::DatabaseError;
use crate::task::TaskRecord;
use crate::timer::PomodoroSession;

/// Returns `~/.config/kitchen-garden[-dev]/` based on KITCHEN_GARDEN_ENV.
///
/// Set KITCHEN_GARDEN_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("KITCHEN_GARDEN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("kitchen-garden-dev")
    } else {
        base_dir.join("kitchen-garden")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Persistence for clipboard history.
///
/// Update and delete report `Ok(false)` when the id is unknown.
pub trait ClipboardStore {
    fn clipboard_entries(&self) -> Result<Vec<ClipboardEntry>, DatabaseError>;
    fn insert_entry(&mut self, entry: &ClipboardEntry) -> Result<(), DatabaseError>;
    fn update_entry(&mut self, entry: &ClipboardEntry) -> Result<bool, DatabaseError>;
    fn delete_entry(&mut self, id: Uuid) -> Result<bool, DatabaseError>;
    /// Remove everything, returning how many entries were deleted.
    fn clear_entries(&mut self) -> Result<usize, DatabaseError>;

    fn pinned_entries(&self) -> Result<Vec<ClipboardEntry>, DatabaseError> {
        let mut pinned: Vec<_> = self
            .clipboard_entries()?
            .into_iter()
            .filter(|e| e.is_pinned)
            .collect();
        pinned.sort_by_key(|e| e.pin_rank());
        Ok(pinned)
    }
}

/// Append-only log of finished work intervals.
pub trait SessionStore {
    fn save_session(&mut self, session: &PomodoroSession) -> Result<(), DatabaseError>;
    /// All sessions, oldest first.
    fn sessions(&self) -> Result<Vec<PomodoroSession>, DatabaseError>;

    fn sessions_for_task(&self, task_id: Uuid) -> Result<Vec<PomodoroSession>, DatabaseError> {
        Ok(self
            .sessions()?
            .into_iter()
            .filter(|s| s.task_id == Some(task_id))
            .collect())
    }
}

/// Task records. Writes are last-write-wins.
pub trait TaskStore {
    fn create_task(&mut self, task: &TaskRecord) -> Result<(), DatabaseError>;
    fn task(&self, id: Uuid) -> Result<Option<TaskRecord>, DatabaseError>;
    /// All tasks, oldest first.
    fn tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError>;
    fn update_task(&mut self, task: &TaskRecord) -> Result<bool, DatabaseError>;
    fn delete_task(&mut self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Add focused seconds to a task's `time_spent_secs`.
    fn add_time_spent(
        &mut self,
        id: Uuid,
        secs: u64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        match self.task(id)? {
            Some(mut task) => {
                task.time_spent_secs = task.time_spent_secs.saturating_add(secs);
                task.updated_at = at;
                self.update_task(&task)
            }
            None => Ok(false),
        }
    }
}
