mod engine;
mod session;
mod settings;

pub use engine::{PhaseKind, PomodoroEngine, TimerPhase, TimerState};
pub use session::{PomodoroSession, SessionStats};
pub use settings::{
    TimerSettings, MAX_PHASE_SECS, MAX_WORK_SESSIONS, MIN_PHASE_SECS, MIN_WORK_SESSIONS,
};
