use std::time::Duration;

use clap::Subcommand;
use kitchen_garden_core::storage::{Config, Database};
use kitchen_garden_core::{
    ClipboardEntry, ClipboardHistoryEngine, ClipboardSource, MemoryClipboard, PollOutcome,
    SystemClock,
};
use serde::Serialize;
use uuid::Uuid;

use super::{parse_id, print_json, runtime, CommandResult};
use crate::system_clipboard::SystemClipboard;

type Engine<Src> = ClipboardHistoryEngine<Database, Src>;

#[derive(Subcommand)]
pub enum ClipboardAction {
    /// List history, pinned entries first
    List {
        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Case-insensitive search over entry content
    Search {
        query: String,
    },
    /// Pin an entry, or unpin it if already pinned
    Pin {
        id: String,
    },
    /// Delete an entry
    Delete {
        id: String,
    },
    /// Delete every entry, pinned ones included
    Clear,
    /// Record text as if it had been copied
    Add {
        text: String,
    },
    /// Put an entry back on the system clipboard
    Copy {
        id: String,
    },
    /// Poll the system clipboard until Ctrl-C
    Watch,
}

/// How an entry is shown in listings.
#[derive(Serialize)]
struct EntryView<'a> {
    id: Uuid,
    preview: String,
    content_type: &'a str,
    timestamp: String,
    pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pinned_order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hotkey: Option<String>,
}

fn views<'a, Src: ClipboardSource>(
    engine: &Engine<Src>,
    entries: &'a [ClipboardEntry],
) -> Vec<EntryView<'a>> {
    entries
        .iter()
        .map(|e| EntryView {
            id: e.id,
            preview: e.preview(),
            content_type: e.content_type.as_str(),
            timestamp: e.timestamp.to_rfc3339(),
            pinned: e.is_pinned,
            pinned_order: e.pinned_order,
            hotkey: engine.hotkey_hint(e.id),
        })
        .collect()
}

fn open_engine<Src: ClipboardSource>(
    config: &Config,
    source: Src,
) -> Result<Engine<Src>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(ClipboardHistoryEngine::new(
        db,
        source,
        config.clipboard_limits(),
        SystemClock,
    ))
}

pub fn run(action: ClipboardAction) -> CommandResult {
    let config = Config::load_or_default();

    match action {
        ClipboardAction::List { limit } => {
            let engine = open_engine(&config, MemoryClipboard::new())?;
            let shown = limit.unwrap_or(usize::MAX).min(engine.entries().len());
            print_json(&views(&engine, &engine.entries()[..shown]))?;
        }
        ClipboardAction::Search { query } => {
            let engine = open_engine(&config, MemoryClipboard::new())?;
            let hits = engine.search(&query);
            print_json(&views(&engine, &hits))?;
        }
        ClipboardAction::Pin { id } => {
            let id = parse_id(&id)?;
            let mut engine = open_engine(&config, MemoryClipboard::new())?;
            if !engine.toggle_pin(id) {
                return Err(format!("entry not found: {id}").into());
            }
            let pinned = engine.entry(id).is_some_and(|e| e.is_pinned);
            println!("{}", if pinned { "pinned" } else { "unpinned" });
        }
        ClipboardAction::Delete { id } => {
            let id = parse_id(&id)?;
            let mut engine = open_engine(&config, MemoryClipboard::new())?;
            if !engine.delete(id) {
                return Err(format!("entry not found: {id}").into());
            }
            println!("ok");
        }
        ClipboardAction::Clear => {
            let mut engine = open_engine(&config, MemoryClipboard::new())?;
            let removed = engine.clear();
            println!("removed {removed} entries");
        }
        ClipboardAction::Add { text } => {
            let clip = MemoryClipboard::new();
            let mut engine = open_engine(&config, clip.clone())?;
            clip.copy(text);
            match engine.poll() {
                PollOutcome::Inserted(id) | PollOutcome::Refreshed(id) => println!("{id}"),
                PollOutcome::Unchanged => return Err("nothing recorded".into()),
            }
        }
        ClipboardAction::Copy { id } => {
            let id = parse_id(&id)?;
            let mut engine = open_engine(&config, SystemClipboard::new()?)?;
            if !engine.copy_entry(id) {
                return Err(format!("could not copy entry {id}").into());
            }
            println!("ok");
        }
        ClipboardAction::Watch => {
            let engine = open_engine(&config, SystemClipboard::new()?)?;
            watch(engine, Duration::from_millis(config.clipboard.poll_interval_ms.max(100)))?;
        }
    }
    Ok(())
}

fn watch(mut engine: Engine<SystemClipboard>, every: Duration) -> CommandResult {
    runtime()?.block_on(async {
        let mut interval = tokio::time::interval(every);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let id = match engine.poll() {
                        PollOutcome::Unchanged => continue,
                        PollOutcome::Inserted(id) | PollOutcome::Refreshed(id) => id,
                    };
                    if let Some(entry) = engine.entry(id) {
                        println!("{}", serde_json::to_string(&views(&engine, std::slice::from_ref(entry)))?);
                    }
                }
                _ = &mut ctrl_c => {
                    tracing::debug!("clipboard watch interrupted");
                    break;
                }
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
