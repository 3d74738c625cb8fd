//! Basic CLI E2E tests.
//!
//! Each test runs the binary against its own temporary HOME so data and
//! config never leak between tests or into the developer's machine.

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_kitchen-garden"))
        .args(args)
        .env("HOME", home)
        .env_remove("KITCHEN_GARDEN_ENV")
        .env_remove("KITCHEN_GARDEN_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

fn run_json(home: &Path, args: &[&str]) -> Value {
    let stdout = run_ok(home, args);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

#[test]
fn config_get_set_and_reset() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    assert_eq!(run_ok(home, &["config", "get", "pomodoro.total_work_sessions"]).trim(), "4");
    run_ok(home, &["config", "set", "clipboard.max_items", "20"]);
    assert_eq!(run_ok(home, &["config", "get", "clipboard.max_items"]).trim(), "20");

    let list = run_json(home, &["config", "list"]);
    assert_eq!(list["clipboard"]["max_items"], 20);

    run_ok(home, &["config", "reset"]);
    assert_eq!(run_ok(home, &["config", "get", "clipboard.max_items"]).trim(), "100");
}

#[test]
fn config_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "pomodoro.colour", "red"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn task_lifecycle() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let task = run_json(home, &["task", "create", "Write report", "--tags", "work, urgent", "--priority", "high"]);
    let id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["priority"], "high");
    assert_eq!(task["tags"].as_array().unwrap().len(), 2);

    let moved = run_json(home, &["task", "status", &id, "in-progress"]);
    assert_eq!(moved["status"], "in_progress");

    let listed = run_json(home, &["task", "list", "--status", "in-progress"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let listed = run_json(home, &["task", "list", "--status", "completed"]);
    assert!(listed.as_array().unwrap().is_empty());

    let detail = run_json(home, &["task", "get", &id]);
    assert_eq!(detail["task"]["title"], "Write report");
    assert_eq!(detail["overdue"], false);

    run_ok(home, &["task", "delete", &id]);
    let (_, _, code) = run_cli(home, &["task", "delete", &id]);
    assert_eq!(code, 1);
}

#[test]
fn task_list_filters_by_priority() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    run_ok(home, &["task", "create", "Inbox zero"]);
    run_ok(home, &["task", "create", "Fix outage", "--priority", "high"]);
    run_ok(home, &["task", "create", "Plan sprint", "--priority", "high"]);

    let high = run_json(home, &["task", "list", "--priority", "high"]);
    assert_eq!(high.as_array().unwrap().len(), 2);
    let none = run_json(home, &["task", "list", "--priority", "none"]);
    assert_eq!(none[0]["title"], "Inbox zero");
    assert!(run_json(home, &["task", "list", "--priority", "low"]).as_array().unwrap().is_empty());

    let (_, stderr, code) = run_cli(home, &["task", "list", "--priority", "urgent"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown priority"));
}

#[test]
fn task_edit_changes_fields_and_bumps_updated_at() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let task = run_json(home, &["task", "create", "Draft", "--tags", "work"]);
    let id = task["id"].as_str().unwrap().to_string();
    thread::sleep(Duration::from_millis(20));

    let edited = run_json(
        home,
        &[
            "task", "edit", &id,
            "--title", "Final draft",
            "--tags", "work, writing",
            "--priority", "medium",
            "--deadline", "2030-03-01T17:00:00Z",
        ],
    );
    assert_eq!(edited["title"], "Final draft");
    assert_eq!(edited["tags"].as_array().unwrap().len(), 2);
    assert_eq!(edited["priority"], "medium");
    assert_eq!(edited["deadline"], "2030-03-01T17:00:00Z");
    assert_eq!(edited["created_at"], task["created_at"]);
    assert_ne!(edited["updated_at"], task["updated_at"]);

    let cleared = run_json(home, &["task", "edit", &id, "--clear-deadline"]);
    assert!(cleared["deadline"].is_null());
    assert_eq!(run_json(home, &["task", "get", &id])["task"]["title"], "Final draft");

    let (_, stderr, code) = run_cli(home, &["task", "edit", &id]);
    assert_eq!(code, 1);
    assert!(stderr.contains("nothing to edit"));
}

#[test]
fn clipboard_add_pin_and_search() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let first = run_ok(home, &["clipboard", "add", "hello world"]).trim().to_string();
    run_ok(home, &["clipboard", "add", "https://example.com"]);
    // Same content again refreshes instead of duplicating.
    assert_eq!(run_ok(home, &["clipboard", "add", "hello world"]).trim(), first);

    let list = run_json(home, &["clipboard", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 2);

    assert_eq!(run_ok(home, &["clipboard", "pin", &first]).trim(), "pinned");
    let list = run_json(home, &["clipboard", "list"]);
    assert_eq!(list[0]["id"], first.as_str());
    assert_eq!(list[0]["pinned_order"], 0);
    assert_eq!(list[0]["hotkey"], "⌘1");
    assert_eq!(list[1]["content_type"], "url");
    assert_eq!(list[1]["hotkey"], "⌘4");

    let hits = run_json(home, &["clipboard", "search", "HELLO"]);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    assert_eq!(run_ok(home, &["clipboard", "pin", &first]).trim(), "unpinned");
    run_ok(home, &["clipboard", "delete", &first]);
    assert_eq!(run_json(home, &["clipboard", "list"]).as_array().unwrap().len(), 1);

    assert_eq!(run_ok(home, &["clipboard", "clear"]).trim(), "removed 1 entries");
}

#[test]
fn clipboard_rejects_bad_ids() {
    let home = TempDir::new().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["clipboard", "pin", "not-a-uuid"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid id"));
}

#[test]
fn timer_commands_persist_state() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let status = run_json(home, &["timer", "status"]);
    assert_eq!(status["type"], "state_snapshot");
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["remaining_ms"], 1_500_000);

    let started = run_json(home, &["timer", "start"]);
    assert_eq!(started["type"], "timer_started");
    assert_eq!(started["phase"], "work");

    assert_eq!(run_json(home, &["timer", "pause"])["type"], "timer_paused");
    assert_eq!(run_json(home, &["timer", "status"])["phase"], "work_paused");
    assert_eq!(run_json(home, &["timer", "resume"])["type"], "timer_resumed");

    let completed = run_json(home, &["timer", "complete"]);
    assert_eq!(completed["type"], "phase_completed");
    assert_eq!(completed["next"], "break");
    assert_eq!(completed["work_session"], 2);

    let stats = run_json(home, &["stats", "summary"]);
    assert_eq!(stats["total_sessions"], 1);

    assert_eq!(run_json(home, &["timer", "skip-break"])["next"], "work");
    assert_eq!(run_json(home, &["timer", "reset"])["type"], "timer_reset");
    assert_eq!(run_json(home, &["timer", "status"])["phase"], "idle");
}

#[test]
fn timer_set_clamps_and_links_task() {
    let home = TempDir::new().unwrap();
    let home = home.path();

    let task = run_json(home, &["task", "create", "Deep work"]);
    let id = task["id"].as_str().unwrap();

    let settings = run_json(home, &["timer", "set", "--work", "10", "--sessions", "1", "--task", id]);
    assert_eq!(settings["work_duration_secs"], 60);
    assert_eq!(settings["total_work_sessions"], 1);
    assert_eq!(settings["task_title"], "Deep work");

    run_ok(home, &["timer", "start"]);
    let done = run_json(home, &["timer", "complete"]);
    assert_eq!(done["type"], "cycle_completed");

    let sessions = run_json(home, &["stats", "sessions", "--task", id]);
    assert_eq!(sessions.as_array().unwrap().len(), 1);
}

#[test]
fn timer_run_yields_to_reset_from_another_terminal() {
    let home = TempDir::new().unwrap();
    let home = home.path();
    run_ok(home, &["timer", "set", "--work", "60", "--sessions", "1"]);

    let mut child = Command::new(env!("CARGO_BIN_EXE_kitchen-garden"))
        .args(["timer", "run"])
        .env("HOME", home)
        .env_remove("KITCHEN_GARDEN_ENV")
        .env_remove("KITCHEN_GARDEN_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn timer run");

    // Wait for the foreground loop to own a running cycle.
    let deadline = Instant::now() + Duration::from_secs(10);
    while run_json(home, &["timer", "status"])["phase"] != "work_running" {
        assert!(Instant::now() < deadline, "timer run never started");
        thread::sleep(Duration::from_millis(100));
    }
    thread::sleep(Duration::from_secs(1));
    assert_eq!(run_json(home, &["timer", "reset"])["type"], "timer_reset");

    let deadline = Instant::now() + Duration::from_secs(15);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().ok();
            child.wait().ok();
            panic!("timer run kept going after reset");
        }
        thread::sleep(Duration::from_millis(100));
    };
    assert!(status.success());

    assert_eq!(run_json(home, &["timer", "status"])["phase"], "idle");
    let sessions = run_json(home, &["stats", "sessions"]);
    assert!(sessions.as_array().unwrap().is_empty());
}
