use std::io::Write;
use std::time::Duration;

use clap::Subcommand;
use kitchen_garden_core::storage::{Config, Database, TaskStore};
use kitchen_garden_core::{Event, PomodoroEngine, SystemClock, TimerPhase, TimerState};

use super::{parse_id, print_json, runtime, CommandResult};

const STATE_KEY: &str = "timer_state";

type Engine = PomodoroEngine<Database>;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a new cycle, or resume a paused one
    Start,
    /// Pause the running phase
    Pause,
    /// Resume a paused phase
    Resume,
    /// Finish the current work interval now, recording the time worked
    Complete,
    /// Discard progress and return to idle
    Reset,
    /// End the current break and start the next work interval
    SkipBreak,
    /// Print current timer state as JSON
    Status,
    /// Drive the timer in the foreground until the cycle ends or Ctrl-C
    Run,
    /// Change timer settings
    Set {
        /// Work interval length in seconds (60..=3600)
        #[arg(long)]
        work: Option<u64>,
        /// Break length in seconds (60..=3600)
        #[arg(long = "break")]
        break_secs: Option<u64>,
        /// Work intervals per cycle (1..=10)
        #[arg(long)]
        sessions: Option<u32>,
        /// Task ID to credit focused time to
        #[arg(long, conflicts_with = "clear_task")]
        task: Option<String>,
        /// Stop crediting a task
        #[arg(long)]
        clear_task: bool,
    },
}

fn load_engine() -> Result<Engine, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let state = match db.kv_get(STATE_KEY)? {
        Some(json) => serde_json::from_str::<TimerState>(&json).unwrap_or_else(|e| {
            tracing::warn!("discarding unreadable timer state: {e}");
            fresh_state()
        }),
        None => fresh_state(),
    };
    Ok(PomodoroEngine::with_state(state, db, SystemClock))
}

fn fresh_state() -> TimerState {
    TimerState::new(Config::load_or_default().timer_settings())
}

/// Persist the engine state and return the JSON that was written.
fn save_engine(engine: &Engine) -> CommandResult<String> {
    let json = serde_json::to_string(engine.state())?;
    engine.store().kv_set(STATE_KEY, &json)?;
    Ok(json)
}

/// Adopt state another invocation saved since `last_saved`. Returns true
/// when the engine changed.
fn adopt_saved_state(engine: &mut Engine, last_saved: &mut String) -> CommandResult<bool> {
    let Some(json) = engine.store().kv_get(STATE_KEY)? else {
        return Ok(false);
    };
    if json == *last_saved {
        return Ok(false);
    }
    match serde_json::from_str::<TimerState>(&json) {
        Ok(state) => {
            tracing::debug!("adopting timer state saved by another command");
            engine.restore(state);
            *last_saved = json;
            Ok(true)
        }
        Err(e) => {
            tracing::warn!("ignoring unreadable timer state: {e}");
            Ok(false)
        }
    }
}

/// Print the command's event, or the current state when the command did not apply.
fn report(engine: &Engine, event: Option<Event>) -> CommandResult {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&engine.snapshot()),
    }
}

pub fn run(action: TimerAction) -> CommandResult {
    let mut engine = load_engine()?;

    // Catch up on time that passed since the last invocation.
    if let Some(event) = engine.tick() {
        print_json(&event)?;
    }

    match action {
        TimerAction::Start => {
            let event = engine.start();
            report(&engine, event)?;
        }
        TimerAction::Pause => {
            let event = engine.pause();
            report(&engine, event)?;
        }
        TimerAction::Resume => {
            let event = engine.resume();
            report(&engine, event)?;
        }
        TimerAction::Complete => {
            let event = engine.complete_work_session();
            report(&engine, event)?;
        }
        TimerAction::Reset => {
            let event = engine.reset();
            report(&engine, event)?;
        }
        TimerAction::SkipBreak => {
            let event = engine.skip_break();
            report(&engine, event)?;
        }
        TimerAction::Status => print_json(&engine.snapshot())?,
        TimerAction::Run => run_foreground(&mut engine)?,
        TimerAction::Set {
            work,
            break_secs,
            sessions,
            task,
            clear_task,
        } => {
            if let Some(secs) = work {
                engine.set_work_duration_secs(secs);
            }
            if let Some(secs) = break_secs {
                engine.set_break_duration_secs(secs);
            }
            if let Some(n) = sessions {
                engine.set_total_work_sessions(n);
            }
            if let Some(raw) = task {
                let id = parse_id(&raw)?;
                let record = engine
                    .store()
                    .task(id)?
                    .ok_or_else(|| format!("task not found: {id}"))?;
                engine.set_task(record.title, Some(id));
            } else if clear_task {
                engine.set_task("", None);
            }
            print_json(engine.settings())?;
        }
    }

    save_engine(&engine)?;
    Ok(())
}

fn run_foreground(engine: &mut Engine) -> CommandResult {
    let started = match engine.phase() {
        TimerPhase::Idle => engine.start(),
        TimerPhase::WorkPaused | TimerPhase::BreakPaused => engine.resume(),
        TimerPhase::WorkRunning | TimerPhase::BreakRunning => None,
    };
    if let Some(event) = started {
        print_json(&event)?;
    }
    let mut last_saved = save_engine(engine)?;

    runtime()?.block_on(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // State saved by another invocation applies before this tick.
                    if adopt_saved_state(engine, &mut last_saved)? && !engine.is_running() {
                        eprintln!();
                        print_json(&engine.snapshot())?;
                        break;
                    }

                    let event = engine.tick();
                    let secs = engine.remaining_secs();
                    eprint!("\r{:02}:{:02} ", secs / 60, secs % 60);
                    std::io::stderr().flush()?;

                    if let Some(event) = event {
                        eprintln!();
                        print_json(&event)?;
                        last_saved = save_engine(engine)?;
                        if matches!(event, Event::CycleCompleted { .. }) {
                            break;
                        }
                    }
                }
                _ = &mut ctrl_c => {
                    eprintln!();
                    tracing::debug!("timer run interrupted");
                    break;
                }
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
