use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{PhaseKind, TimerPhase};

/// Every state change in the system produces an Event.
/// Timer commands return them directly; data-change events go through a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        phase: PhaseKind,
        work_session: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: PhaseKind,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        phase: PhaseKind,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// A work or break phase ran out (or was ended by hand) and the next one began.
    PhaseCompleted {
        phase: PhaseKind,
        next: PhaseKind,
        work_session: u32,
        at: DateTime<Utc>,
    },
    /// The last work session of the cycle ended; the engine is idle again.
    CycleCompleted {
        total_work_sessions: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: TimerPhase,
        work_session: u32,
        total_work_sessions: u32,
        remaining_ms: u64,
        total_ms: u64,
        task_title: String,
        at: DateTime<Utc>,
    },
    /// A pomodoro session record was saved.
    SessionsChanged {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    /// A task record was modified.
    TasksChanged {
        task_id: Uuid,
        at: DateTime<Utc>,
    },
    ClipboardChanged {
        at: DateTime<Utc>,
    },
}

/// Receives data-change events from the engines.
///
/// Delivery is fire-and-forget; a notifier must not fail the caller.
pub trait Notifier {
    fn notify(&self, event: &Event);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &Event) {}
}

impl Notifier for Sender<Event> {
    fn notify(&self, event: &Event) {
        if self.send(event.clone()).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }
}

/// Keeps every event in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events
            .lock()
            .map(|events| events.iter().filter(|e| pred(e)).count())
            .unwrap_or(0)
    }
}

impl Notifier for EventLog {
    fn notify(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
