use chrono::Utc;
use clap::Subcommand;
use kitchen_garden_core::storage::{Database, SessionStore};
use kitchen_garden_core::SessionStats;

use super::{parse_id, print_json, CommandResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Session totals, today's focus and average efficiency
    Summary,
    /// Recorded pomodoro sessions, oldest first
    Sessions {
        /// Only sessions credited to this task
        #[arg(long)]
        task: Option<String>,
    },
}

pub fn run(action: StatsAction) -> CommandResult {
    let db = Database::open()?;

    match action {
        StatsAction::Summary => {
            let sessions = db.sessions()?;
            let stats = SessionStats::from_sessions(&sessions, Utc::now().date_naive());
            print_json(&stats)?;
        }
        StatsAction::Sessions { task } => {
            let sessions = match task {
                Some(raw) => db.sessions_for_task(parse_id(&raw)?)?,
                None => db.sessions()?,
            };
            print_json(&sessions)?;
        }
    }
    Ok(())
}
