//! Pomodoro engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically.
//! Elapsed time is always recomputed from an anchor instant, never
//! accumulated tick by tick, so late or missed ticks do not skew the countdown.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> WorkRunning <-> WorkPaused
//!              |
//!              v  (session saved)
//!         BreakRunning <-> BreakPaused
//!              |
//!              v
//!         WorkRunning ... -> Idle after the last work session
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = PomodoroEngine::new(TimerSettings::default(), store, SystemClock);
//! engine.start();
//! // Once per second:
//! engine.tick(); // Returns Some(Event) when a phase completes
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::session::PomodoroSession;
use super::settings::TimerSettings;
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, Notifier, NullNotifier};
use crate::storage::{SessionStore, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    WorkRunning,
    WorkPaused,
    BreakRunning,
    BreakPaused,
}

/// Which interval a non-idle phase belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Work,
    Break,
}

impl TimerPhase {
    pub fn kind(&self) -> Option<PhaseKind> {
        match self {
            TimerPhase::Idle => None,
            TimerPhase::WorkRunning | TimerPhase::WorkPaused => Some(PhaseKind::Work),
            TimerPhase::BreakRunning | TimerPhase::BreakPaused => Some(PhaseKind::Break),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::WorkRunning | TimerPhase::BreakRunning)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, TimerPhase::WorkPaused | TimerPhase::BreakPaused)
    }

    fn running(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Work => TimerPhase::WorkRunning,
            PhaseKind::Break => TimerPhase::BreakRunning,
        }
    }

    fn paused(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Work => TimerPhase::WorkPaused,
            PhaseKind::Break => TimerPhase::BreakPaused,
        }
    }
}

/// Everything the engine needs to resume after a restart.
///
/// `start_time` is set only while running; `paused_remainder_ms` only while paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    phase: TimerPhase,
    remaining_ms: u64,
    /// 1-based number of the work session in progress (or just finished, during its break).
    work_session: u32,
    /// Length of the current phase, captured when it began.
    phase_duration_secs: u64,
    #[serde(default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    paused_remainder_ms: Option<u64>,
    /// When the current phase began. Unlike `start_time`, never moved by resume.
    #[serde(default)]
    phase_started_at: Option<DateTime<Utc>>,
    settings: TimerSettings,
}

impl TimerState {
    pub fn new(settings: TimerSettings) -> Self {
        let settings = settings.normalized();
        let work = settings.work_duration_secs();
        Self {
            phase: TimerPhase::Idle,
            remaining_ms: secs_to_ms(work),
            work_session: 1,
            phase_duration_secs: work,
            start_time: None,
            paused_remainder_ms: None,
            phase_started_at: None,
            settings,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

/// Core pomodoro engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// The caller is responsible for calling `tick()` periodically.
pub struct PomodoroEngine<S, C = SystemClock> {
    state: TimerState,
    store: S,
    clock: C,
    notifier: Box<dyn Notifier>,
}

impl<S, C> PomodoroEngine<S, C>
where
    S: SessionStore + TaskStore,
    C: Clock,
{
    /// Create an idle engine.
    pub fn new(settings: TimerSettings, store: S, clock: C) -> Self {
        Self::with_state(TimerState::new(settings), store, clock)
    }

    /// Rebuild an engine from a previously saved state.
    pub fn with_state(mut state: TimerState, store: S, clock: C) -> Self {
        state.settings = state.settings.normalized();
        Self {
            state,
            store,
            clock,
            notifier: Box::new(NullNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Adopt a state saved elsewhere, such as by another process sharing
    /// the store. No event is emitted and no session is recorded.
    pub fn restore(&mut self, mut state: TimerState) {
        state.settings = state.settings.normalized();
        self.state = state;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn into_state(self) -> TimerState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.state.settings
    }

    pub fn phase(&self) -> TimerPhase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.state.phase.is_running()
    }

    /// True from `start()` until reset or cycle end, paused or not.
    pub fn is_pomodoro_started(&self) -> bool {
        self.state.phase != TimerPhase::Idle
    }

    pub fn is_break_period(&self) -> bool {
        self.state.phase.kind() == Some(PhaseKind::Break)
    }

    pub fn work_session(&self) -> u32 {
        self.state.work_session
    }

    pub fn remaining_ms(&self) -> u64 {
        self.state.remaining_ms
    }

    /// Remaining time rounded up to whole seconds, as a countdown displays it.
    pub fn remaining_secs(&self) -> u64 {
        self.state.remaining_ms.div_ceil(1000)
    }

    pub fn total_ms(&self) -> u64 {
        secs_to_ms(self.state.phase_duration_secs)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn progress(&self) -> f64 {
        let total = self.total_ms();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.state.remaining_ms as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            work_session: self.state.work_session,
            total_work_sessions: self.state.settings.total_work_sessions(),
            remaining_ms: self.state.remaining_ms,
            total_ms: self.total_ms(),
            task_title: self.state.settings.task_title().to_string(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a fresh cycle from `Idle`, or resume a paused phase.
    pub fn start(&mut self) -> Option<Event> {
        match self.state.phase {
            TimerPhase::Idle => {
                let now = self.clock.now();
                self.state.work_session = 1;
                self.begin_phase(PhaseKind::Work, now);
                tracing::debug!(work_session = 1, "pomodoro started");
                Some(Event::TimerStarted {
                    phase: PhaseKind::Work,
                    work_session: 1,
                    duration_secs: self.state.phase_duration_secs,
                    at: now,
                })
            }
            TimerPhase::WorkPaused | TimerPhase::BreakPaused => self.resume(),
            TimerPhase::WorkRunning | TimerPhase::BreakRunning => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        let kind = match self.state.phase {
            TimerPhase::WorkRunning => PhaseKind::Work,
            TimerPhase::BreakRunning => PhaseKind::Break,
            _ => return None,
        };
        let now = self.clock.now();
        let remainder = self.remaining_at(now);
        self.state.paused_remainder_ms = Some(remainder);
        self.state.remaining_ms = remainder;
        self.state.start_time = None;
        self.state.phase = TimerPhase::paused(kind);
        tracing::debug!(?kind, remainder, "pomodoro paused");
        Some(Event::TimerPaused {
            phase: kind,
            remaining_ms: remainder,
            at: now,
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        let kind = match self.state.phase {
            TimerPhase::WorkPaused => PhaseKind::Work,
            TimerPhase::BreakPaused => PhaseKind::Break,
            _ => return None,
        };
        let now = self.clock.now();
        let remainder = self
            .state
            .paused_remainder_ms
            .take()
            .unwrap_or(self.state.remaining_ms)
            .min(self.total_ms());
        let already_elapsed = self.total_ms() - remainder;
        self.state.start_time = Some(now - ms_duration(already_elapsed));
        self.state.remaining_ms = remainder;
        self.state.phase = TimerPhase::running(kind);
        tracing::debug!(?kind, remainder, "pomodoro resumed");
        Some(Event::TimerResumed {
            phase: kind,
            remaining_ms: remainder,
            at: now,
        })
    }

    /// Hard reset to `Idle`. Discards in-flight progress without saving a session.
    pub fn reset(&mut self) -> Option<Event> {
        self.go_idle();
        tracing::debug!("pomodoro reset");
        Some(Event::TimerReset {
            at: self.clock.now(),
        })
    }

    /// Call periodically. Returns an event when the running phase completes.
    pub fn tick(&mut self) -> Option<Event> {
        let kind = match self.state.phase {
            TimerPhase::WorkRunning => PhaseKind::Work,
            TimerPhase::BreakRunning => PhaseKind::Break,
            _ => return None,
        };
        let now = self.clock.now();
        self.state.remaining_ms = self.remaining_at(now);
        if self.state.remaining_ms > 0 {
            return None;
        }
        match kind {
            PhaseKind::Work => {
                let target = self.state.phase_duration_secs;
                Some(self.finish_work(target, now))
            }
            PhaseKind::Break => Some(self.finish_break(now)),
        }
    }

    /// End the current work phase early, crediting the time actually worked.
    pub fn complete_work_session(&mut self) -> Option<Event> {
        if self.state.phase.kind() != Some(PhaseKind::Work) {
            return None;
        }
        let now = self.clock.now();
        let remaining = match self.state.phase {
            TimerPhase::WorkPaused => self
                .state
                .paused_remainder_ms
                .unwrap_or(self.state.remaining_ms),
            _ => self.remaining_at(now),
        };
        let worked_ms = self.total_ms().saturating_sub(remaining);
        Some(self.finish_work(worked_ms / 1000, now))
    }

    /// Cut the current break short and start the next work interval.
    pub fn skip_break(&mut self) -> Option<Event> {
        if self.state.phase.kind() != Some(PhaseKind::Break) {
            return None;
        }
        let now = self.clock.now();
        Some(self.finish_break(now))
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn set_total_work_sessions(&mut self, n: u32) {
        self.state.settings.set_total_work_sessions(n);
    }

    /// Takes effect from the next work phase; re-bases the display while idle.
    pub fn set_work_duration_secs(&mut self, secs: u64) {
        self.state.settings.set_work_duration_secs(secs);
        if self.state.phase == TimerPhase::Idle {
            let work = self.state.settings.work_duration_secs();
            self.state.phase_duration_secs = work;
            self.state.remaining_ms = secs_to_ms(work);
        }
    }

    /// Takes effect from the next break phase.
    pub fn set_break_duration_secs(&mut self, secs: u64) {
        self.state.settings.set_break_duration_secs(secs);
    }

    pub fn set_task(&mut self, title: impl Into<String>, id: Option<uuid::Uuid>) {
        self.state.settings.set_task(title, id);
    }

    pub fn set_focus_mode_enabled(&mut self, enabled: bool) {
        self.state.settings.set_focus_mode_enabled(enabled);
    }

    pub fn set_falling_tomatoes_enabled(&mut self, enabled: bool) {
        self.state.settings.set_falling_tomatoes_enabled(enabled);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn remaining_at(&self, now: DateTime<Utc>) -> u64 {
        let Some(anchor) = self.state.start_time else {
            return self.state.remaining_ms;
        };
        let elapsed_ms = u64::try_from((now - anchor).num_milliseconds()).unwrap_or(0);
        self.total_ms().saturating_sub(elapsed_ms)
    }

    fn begin_phase(&mut self, kind: PhaseKind, now: DateTime<Utc>) {
        let duration = match kind {
            PhaseKind::Work => self.state.settings.work_duration_secs(),
            PhaseKind::Break => self.state.settings.break_duration_secs(),
        };
        self.state.phase = TimerPhase::running(kind);
        self.state.phase_duration_secs = duration;
        self.state.remaining_ms = secs_to_ms(duration);
        self.state.start_time = Some(now);
        self.state.phase_started_at = Some(now);
        self.state.paused_remainder_ms = None;
    }

    fn go_idle(&mut self) {
        let work = self.state.settings.work_duration_secs();
        self.state.phase = TimerPhase::Idle;
        self.state.work_session = 1;
        self.state.phase_duration_secs = work;
        self.state.remaining_ms = secs_to_ms(work);
        self.state.start_time = None;
        self.state.paused_remainder_ms = None;
        self.state.phase_started_at = None;
    }

    fn finish_work(&mut self, actual_secs: u64, now: DateTime<Utc>) -> Event {
        let target = self.state.phase_duration_secs;
        let total = self.state.settings.total_work_sessions();
        let session = PomodoroSession::new(
            self.state.settings.task_id(),
            self.state
                .phase_started_at
                .unwrap_or_else(|| now - Duration::seconds(actual_secs as i64)),
            now,
            actual_secs,
            target,
            self.state.work_session,
            total,
        );
        self.record_session(&session, now);

        if self.state.work_session < total {
            self.state.work_session += 1;
            self.begin_phase(PhaseKind::Break, now);
            tracing::debug!(work_session = self.state.work_session, "break started");
            Event::PhaseCompleted {
                phase: PhaseKind::Work,
                next: PhaseKind::Break,
                work_session: self.state.work_session,
                at: now,
            }
        } else {
            self.go_idle();
            tracing::debug!(total, "pomodoro cycle completed");
            Event::CycleCompleted {
                total_work_sessions: total,
                at: now,
            }
        }
    }

    fn finish_break(&mut self, now: DateTime<Utc>) -> Event {
        let total = self.state.settings.total_work_sessions();
        if self.state.work_session > total {
            // Total was lowered during the break.
            self.go_idle();
            return Event::CycleCompleted {
                total_work_sessions: total,
                at: now,
            };
        }
        self.begin_phase(PhaseKind::Work, now);
        tracing::debug!(work_session = self.state.work_session, "work started");
        Event::PhaseCompleted {
            phase: PhaseKind::Break,
            next: PhaseKind::Work,
            work_session: self.state.work_session,
            at: now,
        }
    }

    /// Best-effort persistence: failures are logged and never roll back the timer.
    fn record_session(&mut self, session: &PomodoroSession, now: DateTime<Utc>) {
        match self.store.save_session(session) {
            Ok(()) => self.notifier.notify(&Event::SessionsChanged {
                session_id: session.id,
                at: now,
            }),
            Err(e) => tracing::warn!(session_id = %session.id, "failed to save pomodoro session: {e}"),
        }

        let Some(task_id) = session.task_id else {
            return;
        };
        match self
            .store
            .add_time_spent(task_id, session.actual_work_secs, now)
        {
            Ok(true) => self.notifier.notify(&Event::TasksChanged { task_id, at: now }),
            Ok(false) => tracing::debug!(%task_id, "task for pomodoro session no longer exists"),
            Err(e) => tracing::warn!(%task_id, "failed to add time to task: {e}"),
        }
    }
}

fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}

fn ms_duration(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
