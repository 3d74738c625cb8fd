//! Completed focus-session records and their aggregate statistics.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One finished work interval. Append-only: never updated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PomodoroSession {
    pub id: Uuid,
    pub task_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Seconds actually focused, never above `target_work_secs`.
    pub actual_work_secs: u64,
    pub target_work_secs: u64,
    /// 1-based index of this work interval within its cycle.
    pub completed_intervals: u32,
    pub total_intervals: u32,
}

impl PomodoroSession {
    /// Build a record, clamping `actual_work_secs` to the target.
    pub fn new(
        task_id: Option<Uuid>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        actual_work_secs: u64,
        target_work_secs: u64,
        completed_intervals: u32,
        total_intervals: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            start_time,
            end_time,
            actual_work_secs: actual_work_secs.min(target_work_secs),
            target_work_secs,
            completed_intervals,
            total_intervals,
        }
    }

    /// Wall-clock span of the interval, pauses included.
    pub fn total_duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Focused share of the target, 0.0 ..= 1.0.
    pub fn efficiency(&self) -> f64 {
        if self.target_work_secs == 0 {
            return 0.0;
        }
        (self.actual_work_secs as f64 / self.target_work_secs as f64).min(1.0)
    }

    pub fn actual_work_minutes(&self) -> u64 {
        self.actual_work_secs / 60
    }

    pub fn actual_work_hours(&self) -> f64 {
        self.actual_work_secs as f64 / 3600.0
    }

    /// Whether this was the last work interval of its cycle.
    pub fn is_cycle_complete(&self) -> bool {
        self.completed_intervals >= self.total_intervals
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub total_focus_secs: u64,
    pub completed_cycles: u64,
    pub average_efficiency: f64,
    pub today_sessions: u64,
    pub today_focus_secs: u64,
}

impl SessionStats {
    /// Aggregate `sessions`, counting as "today" those that ended on `today` (UTC).
    pub fn from_sessions(sessions: &[PomodoroSession], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        let mut efficiency_sum = 0.0;

        for session in sessions {
            stats.total_sessions += 1;
            stats.total_focus_secs += session.actual_work_secs;
            efficiency_sum += session.efficiency();
            if session.is_cycle_complete() {
                stats.completed_cycles += 1;
            }
            if session.end_time.date_naive() == today {
                stats.today_sessions += 1;
                stats.today_focus_secs += session.actual_work_secs;
            }
        }

        if stats.total_sessions > 0 {
            stats.average_efficiency = efficiency_sum / stats.total_sessions as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
    }

    #[test]
    fn actual_is_clamped_to_target() {
        let s = PomodoroSession::new(None, at(9, 0), at(9, 30), 5000, 1500, 1, 4);
        assert_eq!(s.actual_work_secs, 1500);
        assert_eq!(s.efficiency(), 1.0);
    }

    #[test]
    fn derived_metrics() {
        let s = PomodoroSession::new(None, at(9, 0), at(9, 30), 900, 1500, 2, 2);
        assert_eq!(s.total_duration(), Duration::minutes(30));
        assert!((s.efficiency() - 0.6).abs() < 1e-9);
        assert_eq!(s.actual_work_minutes(), 15);
        assert!((s.actual_work_hours() - 0.25).abs() < 1e-9);
        assert!(s.is_cycle_complete());
    }

    #[test]
    fn zero_target_has_zero_efficiency() {
        let s = PomodoroSession::new(None, at(9, 0), at(9, 0), 0, 0, 1, 1);
        assert_eq!(s.efficiency(), 0.0);
    }

    #[test]
    fn stats_split_today_from_history() {
        let yesterday = Utc.with_ymd_and_hms(2024, 5, 9, 9, 0, 0).unwrap();
        let sessions = vec![
            PomodoroSession::new(None, yesterday, yesterday, 1500, 1500, 1, 2),
            PomodoroSession::new(None, at(9, 0), at(9, 25), 750, 1500, 2, 2),
        ];
        let stats = SessionStats::from_sessions(&sessions, at(12, 0).date_naive());
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_focus_secs, 2250);
        assert_eq!(stats.completed_cycles, 1);
        assert_eq!(stats.today_sessions, 1);
        assert_eq!(stats.today_focus_secs, 750);
        assert!((stats.average_efficiency - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_stats() {
        let stats = SessionStats::from_sessions(&[], at(0, 0).date_naive());
        assert_eq!(stats, SessionStats::default());
    }
}
