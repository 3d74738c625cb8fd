//! Task management commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use kitchen_garden_core::storage::{Database, SessionStore, TaskStore};
use kitchen_garden_core::{Priority, TaskEdit, TaskRecord, TaskStatus};

use super::{parse_id, print_json, CommandResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// none, low, medium or high
        #[arg(long, default_value = "none")]
        priority: String,
        /// Deadline as RFC 3339, e.g. 2025-03-01T17:00:00Z
        #[arg(long)]
        deadline: Option<String>,
    },
    /// List tasks
    List {
        /// Filter by status (created, in-progress, completed)
        #[arg(long)]
        status: Option<String>,
        /// Filter by priority (none, low, medium, high)
        #[arg(long)]
        priority: Option<String>,
    },
    /// Get task details, including its pomodoro sessions
    Get {
        /// Task ID
        id: String,
    },
    /// Change a task's title, tags, priority or deadline
    Edit {
        /// Task ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
        /// none, low, medium or high
        #[arg(long)]
        priority: Option<String>,
        /// Deadline as RFC 3339
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,
        /// Remove the deadline
        #[arg(long)]
        clear_deadline: bool,
    },
    /// Move a task to another column
    Status {
        /// Task ID
        id: String,
        /// created, in-progress or completed
        status: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

fn parse_deadline(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| format!("invalid deadline '{raw}': {e}").into())
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn run(action: TaskAction) -> CommandResult {
    let mut db = Database::open()?;

    match action {
        TaskAction::Create {
            title,
            tags,
            priority,
            deadline,
        } => {
            let tags = tags.as_deref().map(parse_tags).unwrap_or_default();
            let deadline = deadline.as_deref().map(parse_deadline).transpose()?;
            let task = TaskRecord::new(title, Utc::now())
                .with_tags(tags)
                .with_priority(priority.parse::<Priority>()?)
                .with_deadline(deadline);
            db.create_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::List { status, priority } => {
            let status = status.as_deref().map(str::parse::<TaskStatus>).transpose()?;
            let priority = priority.as_deref().map(str::parse::<Priority>).transpose()?;
            let tasks: Vec<_> = db
                .tasks()?
                .into_iter()
                .filter(|t| status.map_or(true, |s| t.status == s))
                .filter(|t| priority.map_or(true, |p| t.priority == p))
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let id = parse_id(&id)?;
            let task = db.task(id)?.ok_or_else(|| format!("task not found: {id}"))?;
            let sessions = db.sessions_for_task(id)?;
            let overdue = task.is_overdue(Utc::now());
            print_json(&serde_json::json!({
                "task": task,
                "overdue": overdue,
                "sessions": sessions,
            }))?;
        }
        TaskAction::Edit {
            id,
            title,
            tags,
            priority,
            deadline,
            clear_deadline,
        } => {
            let id = parse_id(&id)?;
            let deadline = match deadline {
                Some(raw) => Some(Some(parse_deadline(&raw)?)),
                None if clear_deadline => Some(None),
                None => None,
            };
            let edit = TaskEdit {
                title,
                tags: tags.as_deref().map(parse_tags),
                priority: priority.as_deref().map(str::parse::<Priority>).transpose()?,
                deadline,
            };
            if edit.is_empty() {
                return Err("nothing to edit".into());
            }
            let mut task = db.task(id)?.ok_or_else(|| format!("task not found: {id}"))?;
            task.apply(edit, Utc::now());
            db.update_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::Status { id, status } => {
            let id = parse_id(&id)?;
            let status = status.parse::<TaskStatus>()?;
            let mut task = db.task(id)?.ok_or_else(|| format!("task not found: {id}"))?;
            task.status = status;
            task.updated_at = Utc::now();
            db.update_task(&task)?;
            print_json(&task)?;
        }
        TaskAction::Delete { id } => {
            let id = parse_id(&id)?;
            if !db.delete_task(id)? {
                return Err(format!("task not found: {id}").into());
            }
            println!("ok");
        }
    }
    Ok(())
}
