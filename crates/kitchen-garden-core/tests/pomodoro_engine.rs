//! End-to-end pomodoro cycles against an in-memory SQLite store.

use kitchen_garden_core::storage::{Database, SessionStore, TaskStore};
use kitchen_garden_core::{
    Clock, Event, EventLog, ManualClock, PhaseKind, PomodoroEngine, TaskRecord, TimerPhase,
    TimerSettings,
};
use proptest::prelude::*;

type Engine = PomodoroEngine<Database, ManualClock>;

fn setup(settings: TimerSettings) -> (Engine, ManualClock) {
    let clock = ManualClock::default();
    let db = Database::open_memory().unwrap();
    (PomodoroEngine::new(settings, db, clock.clone()), clock)
}

#[test]
fn single_session_minute() {
    let (mut engine, clock) = setup(TimerSettings::new(1, 60, 60));
    engine.start();

    for _ in 0..59 {
        clock.advance_secs(1);
        assert!(engine.tick().is_none());
    }
    assert_eq!(engine.remaining_secs(), 1);

    clock.advance_secs(1);
    let event = engine.tick().unwrap();
    assert!(matches!(event, Event::CycleCompleted { total_work_sessions: 1, .. }));
    assert_eq!(engine.phase(), TimerPhase::Idle);

    let sessions = engine.store().sessions().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].actual_work_secs, 60);
    assert_eq!(sessions[0].target_work_secs, 60);
    assert_eq!(sessions[0].completed_intervals, 1);
}

#[test]
fn two_session_cycle_returns_to_idle() {
    let clock = ManualClock::default();
    let log = EventLog::new();
    let mut engine = PomodoroEngine::new(
        TimerSettings::new(2, 60, 60),
        Database::open_memory().unwrap(),
        clock.clone(),
    )
    .with_notifier(log.clone());

    engine.start();
    let mut phases = Vec::new();
    for _ in 0..3 {
        clock.advance_secs(60);
        match engine.tick() {
            Some(Event::PhaseCompleted { next, .. }) => phases.push(next),
            Some(Event::CycleCompleted { .. }) => break,
            other => panic!("unexpected {other:?}"),
        }
    }

    assert_eq!(phases, vec![PhaseKind::Break, PhaseKind::Work]);
    assert_eq!(engine.phase(), TimerPhase::Idle);
    assert_eq!(engine.work_session(), 1);
    assert_eq!(engine.store().sessions().unwrap().len(), 2);
    assert_eq!(log.count(|e| matches!(e, Event::SessionsChanged { .. })), 2);
}

#[test]
fn early_completion_records_partial_work() {
    let (mut engine, clock) = setup(TimerSettings::new(1, 1500, 300));
    engine.start();
    clock.advance_secs(600);
    engine.complete_work_session();

    let session = &engine.store().sessions().unwrap()[0];
    assert_eq!(session.actual_work_secs, 600);
    assert!((session.efficiency() - 0.4).abs() < 0.01);
}

#[test]
fn completed_sessions_credit_the_task() {
    let clock = ManualClock::default();
    let mut db = Database::open_memory().unwrap();
    let task = TaskRecord::new("Refactor parser", clock.now());
    db.create_task(&task).unwrap();

    let settings = TimerSettings::new(2, 120, 60).with_task(&task.title, Some(task.id));
    let mut engine = PomodoroEngine::new(settings, db, clock.clone());
    engine.start();
    clock.advance_secs(120);
    engine.tick();
    engine.skip_break();
    clock.advance_secs(90);
    engine.complete_work_session();

    let store = engine.store();
    assert_eq!(store.task(task.id).unwrap().unwrap().time_spent_secs, 210);
    assert_eq!(store.sessions_for_task(task.id).unwrap().len(), 2);
}

#[test]
fn pause_holds_the_countdown() {
    let (mut engine, clock) = setup(TimerSettings::new(1, 300, 60));
    engine.start();
    clock.advance_secs(100);
    engine.pause();
    clock.advance_secs(10_000);
    assert!(engine.tick().is_none());
    assert_eq!(engine.remaining_ms(), 200_000);

    engine.resume();
    clock.advance_secs(200);
    assert!(matches!(engine.tick(), Some(Event::CycleCompleted { .. })));
}

proptest! {
    #[test]
    fn irregular_ticks_finish_work_exactly_once(steps in prop::collection::vec(1i64..7_000, 1..60)) {
        let (mut engine, clock) = setup(TimerSettings::new(2, 60, 300));
        engine.start();

        // Advance in irregular millisecond steps until exactly 60 s have passed.
        let mut elapsed = 0i64;
        let mut exits = 0;
        for step in steps {
            let step = step.min(60_000 - elapsed);
            if step == 0 {
                break;
            }
            clock.advance(chrono::Duration::milliseconds(step));
            elapsed += step;
            if engine.tick().is_some() {
                exits += 1;
            }
        }
        if elapsed < 60_000 {
            clock.advance(chrono::Duration::milliseconds(60_000 - elapsed));
            if engine.tick().is_some() {
                exits += 1;
            }
        }

        prop_assert_eq!(exits, 1);
        prop_assert_eq!(engine.phase(), TimerPhase::BreakRunning);
        prop_assert_eq!(engine.remaining_ms(), 300_000);
    }
}
