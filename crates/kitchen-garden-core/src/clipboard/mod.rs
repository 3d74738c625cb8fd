//! Clipboard history: entries, the sources they come from, and the engine.

mod entry;
mod history;
mod source;

pub use entry::{presentation_order, sort_for_presentation, ClipboardEntry, ContentType};
pub use history::{
    ClipboardHistoryEngine, ClipboardLimits, PollOutcome, DEFAULT_MAX_ITEMS, DEFAULT_MAX_PINNED,
    PINNED_HOTKEY_SLOTS, RECENT_HOTKEY_SLOTS,
};
pub use source::{ChangeToken, ClipboardPayload, ClipboardSource, MemoryClipboard};
