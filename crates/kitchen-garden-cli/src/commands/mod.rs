pub mod clipboard;
pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use serde::Serialize;
use uuid::Uuid;

pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn parse_id(raw: &str) -> Result<Uuid, Box<dyn std::error::Error>> {
    Uuid::parse_str(raw.trim()).map_err(|e| format!("invalid id '{raw}': {e}").into())
}

/// Single-threaded runtime for the `run` and `watch` loops.
pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
