//! In-process store implementing every storage trait.
//!
//! Clones share the same data, so a test can hand one handle to an engine and
//! inspect or sabotage the store through another.

use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use super::{ClipboardStore, SessionStore, TaskStore};
use crate::clipboard::ClipboardEntry;
use crate::error::DatabaseError;
use crate::task::TaskRecord;
use crate::timer::PomodoroSession;

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<ClipboardEntry>,
    sessions: Vec<PomodoroSession>,
    tasks: Vec<TaskRecord>,
    failing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every read and write fails with [`DatabaseError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing = failing;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, DatabaseError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| DatabaseError::Unavailable("memory store poisoned".into()))?;
        if inner.failing {
            return Err(DatabaseError::Unavailable("memory store set to fail".into()));
        }
        Ok(inner)
    }
}

impl ClipboardStore for MemoryStore {
    fn clipboard_entries(&self) -> Result<Vec<ClipboardEntry>, DatabaseError> {
        Ok(self.lock()?.entries.clone())
    }

    fn insert_entry(&mut self, entry: &ClipboardEntry) -> Result<(), DatabaseError> {
        self.lock()?.entries.push(entry.clone());
        Ok(())
    }

    fn update_entry(&mut self, entry: &ClipboardEntry) -> Result<bool, DatabaseError> {
        let mut inner = self.lock()?;
        match inner.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(slot) => {
                *slot = entry.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_entry(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut inner = self.lock()?;
        let before = inner.entries.len();
        inner.entries.retain(|e| e.id != id);
        Ok(inner.entries.len() != before)
    }

    fn clear_entries(&mut self) -> Result<usize, DatabaseError> {
        let mut inner = self.lock()?;
        let removed = inner.entries.len();
        inner.entries.clear();
        Ok(removed)
    }
}

impl SessionStore for MemoryStore {
    fn save_session(&mut self, session: &PomodoroSession) -> Result<(), DatabaseError> {
        self.lock()?.sessions.push(session.clone());
        Ok(())
    }

    fn sessions(&self) -> Result<Vec<PomodoroSession>, DatabaseError> {
        Ok(self.lock()?.sessions.clone())
    }
}

impl TaskStore for MemoryStore {
    fn create_task(&mut self, task: &TaskRecord) -> Result<(), DatabaseError> {
        self.lock()?.tasks.push(task.clone());
        Ok(())
    }

    fn task(&self, id: Uuid) -> Result<Option<TaskRecord>, DatabaseError> {
        Ok(self.lock()?.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError> {
        Ok(self.lock()?.tasks.clone())
    }

    fn update_task(&mut self, task: &TaskRecord) -> Result<bool, DatabaseError> {
        let mut inner = self.lock()?;
        match inner.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_task(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut inner = self.lock()?;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        Ok(inner.tasks.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ContentType;
    use chrono::Utc;

    #[test]
    fn clones_share_data() {
        let mut store = MemoryStore::new();
        let view = store.clone();
        store
            .insert_entry(&ClipboardEntry::new("x", ContentType::Text, Utc::now()))
            .unwrap();
        assert_eq!(view.clipboard_entries().unwrap().len(), 1);
    }

    #[test]
    fn failing_store_rejects_everything() {
        let mut store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.clipboard_entries().is_err());
        assert!(store.create_task(&TaskRecord::new("t", Utc::now())).is_err());
        store.set_failing(false);
        assert!(store.tasks().unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_are_not_errors() {
        let mut store = MemoryStore::new();
        assert!(!store.delete_entry(Uuid::new_v4()).unwrap());
        assert!(!store.delete_task(Uuid::new_v4()).unwrap());
        assert!(!store.add_time_spent(Uuid::new_v4(), 60, Utc::now()).unwrap());
    }

    #[test]
    fn add_time_spent_accumulates() {
        let mut store = MemoryStore::new();
        let task = TaskRecord::new("Focus", Utc::now());
        store.create_task(&task).unwrap();
        store.add_time_spent(task.id, 90, Utc::now()).unwrap();
        store.add_time_spent(task.id, 30, Utc::now()).unwrap();
        assert_eq!(store.task(task.id).unwrap().unwrap().time_spent_secs, 120);
    }
}
