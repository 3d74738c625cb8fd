//! Task records for the board.
//!
//! The timer only touches tasks through [`crate::storage::TaskStore::add_time_spent`];
//! everything else here is plain data for the CLI and other collaborators.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Created,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskStatus::Created => "Created",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "created" => Ok(TaskStatus::Created),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Task priority. `None` is a real value, not a missing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Focused seconds accumulated from pomodoro sessions.
    #[serde(default)]
    pub time_spent_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field changes for an existing task. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the deadline.
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none() && self.priority.is_none() && self.deadline.is_none()
    }
}

impl TaskRecord {
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            tags: Vec::new(),
            priority: Priority::None,
            deadline: None,
            status: TaskStatus::Created,
            time_spent_secs: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Apply `edit` and bump `updated_at`. An empty edit leaves the task untouched.
    pub fn apply(&mut self, edit: TaskEdit, now: DateTime<Utc>) -> bool {
        if edit.is_empty() {
            return false;
        }
        if let Some(title) = edit.title {
            self.title = title;
        }
        if let Some(tags) = edit.tags {
            self.tags = tags;
        }
        if let Some(priority) = edit.priority {
            self.priority = priority;
        }
        if let Some(deadline) = edit.deadline {
            self.deadline = deadline;
        }
        self.updated_at = now;
        true
    }

    pub fn time_spent_minutes(&self) -> u64 {
        self.time_spent_secs / 60
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.deadline.is_some_and(|d| d < now)
    }
}
