//! # Kitchen Garden Core Library
//!
//! Business logic for the Kitchen Garden productivity tools. Every operation is
//! available through the standalone `kitchen-garden` CLI, which is a thin layer
//! over this crate.
//!
//! ## Architecture
//!
//! - **Pomodoro Engine**: a wall-clock-based work/break state machine. The caller
//!   invokes `tick()` periodically; elapsed time is always measured from an anchor.
//! - **Clipboard History**: a deduplicating, size-bounded history polled from a
//!   [`ClipboardSource`], with a densely ranked pinned list.
//! - **Storage**: SQLite persistence behind the [`ClipboardStore`],
//!   [`SessionStore`] and [`TaskStore`] traits, plus TOML configuration.
//!
//! Neither engine spawns threads or returns errors from its commands: store
//! failures are logged through `tracing` and absorbed.
//!
//! ## Key Components
//!
//! - [`PomodoroEngine`]: timer state machine
//! - [`ClipboardHistoryEngine`]: clipboard history and pinning
//! - [`Database`]: SQLite-backed store
//! - [`Config`]: application configuration

pub mod clipboard;
pub mod clock;
pub mod error;
pub mod events;
pub mod storage;
pub mod task;
pub mod timer;

pub use clipboard::{
    ClipboardEntry, ClipboardHistoryEngine, ClipboardLimits, ClipboardPayload, ClipboardSource,
    ChangeToken, ContentType, MemoryClipboard, PollOutcome,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError};
pub use events::{Event, EventLog, Notifier, NullNotifier};
pub use storage::{ClipboardStore, Config, Database, MemoryStore, SessionStore, TaskStore};
pub use task::{Priority, TaskEdit, TaskRecord, TaskStatus};
pub use timer::{
    PhaseKind, PomodoroEngine, PomodoroSession, SessionStats, TimerPhase, TimerSettings,
    TimerState,
};
