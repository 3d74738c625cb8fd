//! SQLite-backed store.
//!
//! Provides persistent storage for:
//! - Clipboard history entries
//! - Completed pomodoro sessions
//! - Task records
//! - Key-value store for application state (the CLI keeps timer state here)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{data_dir, ClipboardStore, SessionStore, TaskStore};
use crate::clipboard::ClipboardEntry;
use crate::error::{DatabaseError, Result};
use crate::task::TaskRecord;
use crate::timer::PomodoroSession;

/// SQLite database implementing every storage trait.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/kitchen-garden.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("kitchen-garden.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.create_schema()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS clipboard_entries (
                id            TEXT PRIMARY KEY,
                content       TEXT NOT NULL,
                timestamp     TEXT NOT NULL,
                content_type  TEXT NOT NULL DEFAULT 'text',
                is_pinned     INTEGER NOT NULL DEFAULT 0,
                pinned_order  INTEGER
            );

            CREATE TABLE IF NOT EXISTS pomodoro_sessions (
                id                  TEXT PRIMARY KEY,
                task_id             TEXT,
                start_time          TEXT NOT NULL,
                end_time            TEXT NOT NULL,
                actual_work_secs    INTEGER NOT NULL,
                target_work_secs    INTEGER NOT NULL,
                completed_intervals INTEGER NOT NULL,
                total_intervals     INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id              TEXT PRIMARY KEY,
                title           TEXT NOT NULL,
                tags            TEXT NOT NULL DEFAULT '[]',
                priority        TEXT NOT NULL DEFAULT 'none',
                deadline        TEXT,
                status          TEXT NOT NULL DEFAULT 'created',
                time_spent_secs INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_clipboard_timestamp ON clipboard_entries(timestamp);
            CREATE INDEX IF NOT EXISTS idx_sessions_end_time ON pomodoro_sessions(end_time);
            CREATE INDEX IF NOT EXISTS idx_sessions_task_id ON pomodoro_sessions(task_id);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

// ── Row decoding ─────────────────────────────────────────────────────

struct EntryRow {
    id: String,
    content: String,
    timestamp: String,
    content_type: String,
    is_pinned: bool,
    pinned_order: Option<i64>,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            timestamp: row.get(2)?,
            content_type: row.get(3)?,
            is_pinned: row.get(4)?,
            pinned_order: row.get(5)?,
        })
    }

    fn decode(self) -> Result<ClipboardEntry, DatabaseError> {
        const TABLE: &str = "clipboard_entries";
        Ok(ClipboardEntry {
            id: parse_uuid(TABLE, &self.id)?,
            content: self.content,
            timestamp: parse_time(TABLE, &self.timestamp)?,
            content_type: self
                .content_type
                .parse()
                .map_err(|message| corrupt(TABLE, message))?,
            is_pinned: self.is_pinned,
            pinned_order: self
                .pinned_order
                .map(|o| u32::try_from(o).map_err(|e| corrupt(TABLE, e.to_string())))
                .transpose()?,
        })
    }
}

struct SessionRow {
    id: String,
    task_id: Option<String>,
    start_time: String,
    end_time: String,
    actual_work_secs: i64,
    target_work_secs: i64,
    completed_intervals: i64,
    total_intervals: i64,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            actual_work_secs: row.get(4)?,
            target_work_secs: row.get(5)?,
            completed_intervals: row.get(6)?,
            total_intervals: row.get(7)?,
        })
    }

    fn decode(self) -> Result<PomodoroSession, DatabaseError> {
        const TABLE: &str = "pomodoro_sessions";
        Ok(PomodoroSession {
            id: parse_uuid(TABLE, &self.id)?,
            task_id: self
                .task_id
                .as_deref()
                .map(|id| parse_uuid(TABLE, id))
                .transpose()?,
            start_time: parse_time(TABLE, &self.start_time)?,
            end_time: parse_time(TABLE, &self.end_time)?,
            actual_work_secs: non_negative(TABLE, self.actual_work_secs)?,
            target_work_secs: non_negative(TABLE, self.target_work_secs)?,
            completed_intervals: interval_count(TABLE, self.completed_intervals)?,
            total_intervals: interval_count(TABLE, self.total_intervals)?,
        })
    }
}

struct TaskRow {
    id: String,
    title: String,
    tags: String,
    priority: String,
    deadline: Option<String>,
    status: String,
    time_spent_secs: i64,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            tags: row.get(2)?,
            priority: row.get(3)?,
            deadline: row.get(4)?,
            status: row.get(5)?,
            time_spent_secs: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> Result<TaskRecord, DatabaseError> {
        const TABLE: &str = "tasks";
        Ok(TaskRecord {
            id: parse_uuid(TABLE, &self.id)?,
            title: self.title,
            tags: serde_json::from_str(&self.tags).map_err(|e| corrupt(TABLE, e.to_string()))?,
            priority: self.priority.parse().map_err(|m| corrupt(TABLE, m))?,
            deadline: self
                .deadline
                .as_deref()
                .map(|d| parse_time(TABLE, d))
                .transpose()?,
            status: self.status.parse().map_err(|m| corrupt(TABLE, m))?,
            time_spent_secs: non_negative(TABLE, self.time_spent_secs)?,
            created_at: parse_time(TABLE, &self.created_at)?,
            updated_at: parse_time(TABLE, &self.updated_at)?,
        })
    }
}

fn corrupt(table: &str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::Corrupt {
        table: table.to_string(),
        message: message.into(),
    }
}

fn parse_uuid(table: &str, raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| corrupt(table, e.to_string()))
}

fn parse_time(table: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(table, e.to_string()))
}

fn non_negative(table: &str, value: i64) -> Result<u64, DatabaseError> {
    u64::try_from(value).map_err(|_| corrupt(table, format!("negative value {value}")))
}

fn interval_count(table: &str, value: i64) -> Result<u32, DatabaseError> {
    u32::try_from(non_negative(table, value)?).map_err(|e| corrupt(table, e.to_string()))
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

// ── Store impls ──────────────────────────────────────────────────────

impl ClipboardStore for Database {
    fn clipboard_entries(&self) -> Result<Vec<ClipboardEntry>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, timestamp, content_type, is_pinned, pinned_order
             FROM clipboard_entries
             ORDER BY timestamp DESC",
        )?;
        let rows = stmt.query_map([], EntryRow::from_row)?;
        let decoded = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(EntryRow::decode))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decoded)
    }

    fn insert_entry(&mut self, entry: &ClipboardEntry) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO clipboard_entries (id, content, timestamp, content_type, is_pinned, pinned_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id.to_string(),
                entry.content,
                entry.timestamp.to_rfc3339(),
                entry.content_type.as_str(),
                entry.is_pinned,
                entry.pinned_order,
            ],
        )?;
        Ok(())
    }

    fn update_entry(&mut self, entry: &ClipboardEntry) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE clipboard_entries
             SET content = ?2, timestamp = ?3, content_type = ?4, is_pinned = ?5, pinned_order = ?6
             WHERE id = ?1",
            params![
                entry.id.to_string(),
                entry.content,
                entry.timestamp.to_rfc3339(),
                entry.content_type.as_str(),
                entry.is_pinned,
                entry.pinned_order,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_entry(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "DELETE FROM clipboard_entries WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn clear_entries(&mut self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM clipboard_entries", [])?)
    }
}

impl SessionStore for Database {
    fn save_session(&mut self, session: &PomodoroSession) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO pomodoro_sessions
                (id, task_id, start_time, end_time, actual_work_secs, target_work_secs,
                 completed_intervals, total_intervals)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id.to_string(),
                session.task_id.map(|id| id.to_string()),
                session.start_time.to_rfc3339(),
                session.end_time.to_rfc3339(),
                to_sql_int(session.actual_work_secs),
                to_sql_int(session.target_work_secs),
                session.completed_intervals,
                session.total_intervals,
            ],
        )?;
        Ok(())
    }

    fn sessions(&self) -> Result<Vec<PomodoroSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, start_time, end_time, actual_work_secs, target_work_secs,
                    completed_intervals, total_intervals
             FROM pomodoro_sessions
             ORDER BY end_time ASC",
        )?;
        let rows = stmt.query_map([], SessionRow::from_row)?;
        let decoded = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(SessionRow::decode))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decoded)
    }

    fn sessions_for_task(&self, task_id: Uuid) -> Result<Vec<PomodoroSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, start_time, end_time, actual_work_secs, target_work_secs,
                    completed_intervals, total_intervals
             FROM pomodoro_sessions
             WHERE task_id = ?1
             ORDER BY end_time ASC",
        )?;
        let rows = stmt.query_map(params![task_id.to_string()], SessionRow::from_row)?;
        let decoded = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(SessionRow::decode))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decoded)
    }
}

const TASK_COLUMNS: &str =
    "id, title, tags, priority, deadline, status, time_spent_secs, created_at, updated_at";

impl TaskStore for Database {
    fn create_task(&mut self, task: &TaskRecord) -> Result<(), DatabaseError> {
        let tags = serde_json::to_string(&task.tags).map_err(|e| corrupt("tasks", e.to_string()))?;
        self.conn.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                task.id.to_string(),
                task.title,
                tags,
                task.priority.as_str(),
                task.deadline.map(|d| d.to_rfc3339()),
                task.status.as_str(),
                to_sql_int(task.time_spent_secs),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn task(&self, id: Uuid) -> Result<Option<TaskRecord>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id.to_string()],
                TaskRow::from_row,
            )
            .optional()?;
        row.map(TaskRow::decode).transpose()
    }

    fn tasks(&self) -> Result<Vec<TaskRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at ASC"))?;
        let rows = stmt.query_map([], TaskRow::from_row)?;
        let decoded = rows
            .map(|row| row.map_err(DatabaseError::from).and_then(TaskRow::decode))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(decoded)
    }

    fn update_task(&mut self, task: &TaskRecord) -> Result<bool, DatabaseError> {
        let tags = serde_json::to_string(&task.tags).map_err(|e| corrupt("tasks", e.to_string()))?;
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2, tags = ?3, priority = ?4, deadline = ?5, status = ?6,
                 time_spent_secs = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                task.id.to_string(),
                task.title,
                tags,
                task.priority.as_str(),
                task.deadline.map(|d| d.to_rfc3339()),
                task.status.as_str(),
                to_sql_int(task.time_spent_secs),
                task.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_task(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    fn add_time_spent(
        &mut self,
        id: Uuid,
        secs: u64,
        at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET time_spent_secs = time_spent_secs + ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), to_sql_int(secs), at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ContentType;
    use crate::task::{Priority, TaskStatus};
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn clipboard_entry_round_trip() {
        let mut db = Database::open_memory().unwrap();
        let mut entry = ClipboardEntry::new("https://example.com", ContentType::Url, t(0));
        entry.is_pinned = true;
        entry.pinned_order = Some(0);
        db.insert_entry(&entry).unwrap();

        let loaded = db.clipboard_entries().unwrap();
        assert_eq!(loaded, vec![entry.clone()]);

        entry.is_pinned = false;
        entry.pinned_order = None;
        assert!(db.update_entry(&entry).unwrap());
        assert_eq!(db.clipboard_entries().unwrap()[0].pinned_order, None);

        assert!(db.delete_entry(entry.id).unwrap());
        assert!(!db.delete_entry(entry.id).unwrap());
    }

    #[test]
    fn clear_reports_count() {
        let mut db = Database::open_memory().unwrap();
        for i in 0..3 {
            db.insert_entry(&ClipboardEntry::new(format!("c{i}"), ContentType::Text, t(i)))
                .unwrap();
        }
        assert_eq!(db.clear_entries().unwrap(), 3);
        assert!(db.clipboard_entries().unwrap().is_empty());
    }

    #[test]
    fn sessions_filter_by_task() {
        let mut db = Database::open_memory().unwrap();
        let task_id = Uuid::new_v4();
        db.save_session(&PomodoroSession::new(Some(task_id), t(0), t(1500), 1500, 1500, 1, 2))
            .unwrap();
        db.save_session(&PomodoroSession::new(None, t(1800), t(3300), 600, 1500, 2, 2))
            .unwrap();

        assert_eq!(db.sessions().unwrap().len(), 2);
        let for_task = db.sessions_for_task(task_id).unwrap();
        assert_eq!(for_task.len(), 1);
        assert_eq!(for_task[0].actual_work_secs, 1500);
    }

    #[test]
    fn task_crud_and_time_accumulation() {
        let mut db = Database::open_memory().unwrap();
        let mut task = TaskRecord::new("Write docs", t(0))
            .with_tags(vec!["docs".into(), "q2".into()])
            .with_priority(Priority::High)
            .with_deadline(Some(t(86_400)));
        db.create_task(&task).unwrap();

        assert!(db.add_time_spent(task.id, 300, t(10)).unwrap());
        let loaded = db.task(task.id).unwrap().unwrap();
        assert_eq!(loaded.time_spent_secs, 300);
        assert_eq!(loaded.tags, vec!["docs", "q2"]);
        assert_eq!(loaded.priority, Priority::High);

        task.status = TaskStatus::Completed;
        task.time_spent_secs = loaded.time_spent_secs;
        assert!(db.update_task(&task).unwrap());
        assert_eq!(db.tasks().unwrap()[0].status, TaskStatus::Completed);

        assert!(db.delete_task(task.id).unwrap());
        assert!(db.task(task.id).unwrap().is_none());
        assert!(!db.add_time_spent(task.id, 1, t(20)).unwrap());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn corrupt_row_is_reported() {
        let db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO clipboard_entries (id, content, timestamp) VALUES ('not-a-uuid', 'x', 'nope')",
                [],
            )
            .unwrap();
        assert!(matches!(
            db.clipboard_entries(),
            Err(DatabaseError::Corrupt { .. })
        ));
    }

    #[test]
    fn oversized_interval_count_is_corrupt() {
        let db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO pomodoro_sessions
                 (id, task_id, start_time, end_time, actual_work_secs, target_work_secs,
                  completed_intervals, total_intervals)
                 VALUES (?1, NULL, '2024-01-01T09:00:00Z', '2024-01-01T09:25:00Z', 1500, 1500,
                         5000000000, 4)",
                [Uuid::new_v4().to_string()],
            )
            .unwrap();
        let err = db.sessions().unwrap_err();
        assert!(matches!(err, DatabaseError::Corrupt { ref table, .. } if table == "pomodoro_sessions"));
    }
}
