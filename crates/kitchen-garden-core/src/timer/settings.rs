use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_WORK_SESSIONS: u32 = 1;
pub const MAX_WORK_SESSIONS: u32 = 10;
/// Shortest allowed work or break phase, in seconds.
pub const MIN_PHASE_SECS: u64 = 60;
/// Longest allowed work or break phase, in seconds.
pub const MAX_PHASE_SECS: u64 = 3600;

/// User-facing timer configuration.
///
/// Every setter clamps to the valid range instead of rejecting input, so a
/// `TimerSettings` value is always in range once constructed through this API.
/// Values deserialized from disk go through [`TimerSettings::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSettings {
    #[serde(default)]
    task_title: String,
    #[serde(default)]
    task_id: Option<Uuid>,
    #[serde(default = "default_total_work_sessions")]
    total_work_sessions: u32,
    #[serde(default = "default_work_duration_secs")]
    work_duration_secs: u64,
    #[serde(default = "default_break_duration_secs")]
    break_duration_secs: u64,
    #[serde(default)]
    focus_mode_enabled: bool,
    #[serde(default)]
    falling_tomatoes_enabled: bool,
}

fn default_total_work_sessions() -> u32 {
    4
}
fn default_work_duration_secs() -> u64 {
    25 * 60
}
fn default_break_duration_secs() -> u64 {
    5 * 60
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            task_title: String::new(),
            task_id: None,
            total_work_sessions: default_total_work_sessions(),
            work_duration_secs: default_work_duration_secs(),
            break_duration_secs: default_break_duration_secs(),
            focus_mode_enabled: false,
            falling_tomatoes_enabled: false,
        }
    }
}

impl TimerSettings {
    /// Build settings from raw values, clamping each one.
    pub fn new(total_work_sessions: u32, work_duration_secs: u64, break_duration_secs: u64) -> Self {
        Self::default()
            .with_total_work_sessions(total_work_sessions)
            .with_work_duration_secs(work_duration_secs)
            .with_break_duration_secs(break_duration_secs)
    }

    /// Re-apply every bound. Used after deserializing.
    pub fn normalized(self) -> Self {
        let (sessions, work, brk) = (
            self.total_work_sessions,
            self.work_duration_secs,
            self.break_duration_secs,
        );
        self.with_total_work_sessions(sessions)
            .with_work_duration_secs(work)
            .with_break_duration_secs(brk)
    }

    pub fn with_total_work_sessions(mut self, n: u32) -> Self {
        self.set_total_work_sessions(n);
        self
    }

    pub fn with_work_duration_secs(mut self, secs: u64) -> Self {
        self.set_work_duration_secs(secs);
        self
    }

    pub fn with_break_duration_secs(mut self, secs: u64) -> Self {
        self.set_break_duration_secs(secs);
        self
    }

    pub fn with_task(mut self, title: impl Into<String>, id: Option<Uuid>) -> Self {
        self.set_task(title, id);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn task_title(&self) -> &str {
        &self.task_title
    }

    pub fn task_id(&self) -> Option<Uuid> {
        self.task_id
    }

    pub fn total_work_sessions(&self) -> u32 {
        self.total_work_sessions
    }

    pub fn work_duration_secs(&self) -> u64 {
        self.work_duration_secs
    }

    pub fn break_duration_secs(&self) -> u64 {
        self.break_duration_secs
    }

    pub fn focus_mode_enabled(&self) -> bool {
        self.focus_mode_enabled
    }

    pub fn falling_tomatoes_enabled(&self) -> bool {
        self.falling_tomatoes_enabled
    }

    // ── Setters (clamp-on-write) ─────────────────────────────────────

    pub fn set_total_work_sessions(&mut self, n: u32) {
        self.total_work_sessions = n.clamp(MIN_WORK_SESSIONS, MAX_WORK_SESSIONS);
    }

    pub fn set_work_duration_secs(&mut self, secs: u64) {
        self.work_duration_secs = clamp_phase(secs);
    }

    pub fn set_break_duration_secs(&mut self, secs: u64) {
        self.break_duration_secs = clamp_phase(secs);
    }

    pub fn set_task(&mut self, title: impl Into<String>, id: Option<Uuid>) {
        self.task_title = title.into();
        self.task_id = id;
    }

    pub fn set_focus_mode_enabled(&mut self, enabled: bool) {
        self.focus_mode_enabled = enabled;
    }

    pub fn set_falling_tomatoes_enabled(&mut self, enabled: bool) {
        self.falling_tomatoes_enabled = enabled;
    }
}

fn clamp_phase(secs: u64) -> u64 {
    secs.clamp(MIN_PHASE_SECS, MAX_PHASE_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp_to_bounds() {
        let mut s = TimerSettings::default();
        s.set_total_work_sessions(0);
        assert_eq!(s.total_work_sessions(), 1);
        s.set_total_work_sessions(42);
        assert_eq!(s.total_work_sessions(), 10);
        s.set_work_duration_secs(5);
        assert_eq!(s.work_duration_secs(), 60);
        s.set_break_duration_secs(10_000);
        assert_eq!(s.break_duration_secs(), 3600);
    }

    #[test]
    fn in_range_values_are_kept() {
        let s = TimerSettings::new(3, 1200, 240);
        assert_eq!(s.total_work_sessions(), 3);
        assert_eq!(s.work_duration_secs(), 1200);
        assert_eq!(s.break_duration_secs(), 240);
    }

    #[test]
    fn normalized_fixes_out_of_range_json() {
        let raw = r#"{"total_work_sessions": 99, "work_duration_secs": 1, "break_duration_secs": 7200}"#;
        let s: TimerSettings = serde_json::from_str(raw).unwrap();
        let s = s.normalized();
        assert_eq!(s.total_work_sessions(), 10);
        assert_eq!(s.work_duration_secs(), 60);
        assert_eq!(s.break_duration_secs(), 3600);
    }

    #[test]
    fn defaults() {
        let s = TimerSettings::default();
        assert_eq!(s.total_work_sessions(), 4);
        assert_eq!(s.work_duration_secs(), 1500);
        assert_eq!(s.break_duration_secs(), 300);
        assert!(s.task_id().is_none());
        assert!(!s.focus_mode_enabled());
    }
}
