//! Bounded, deduplicated clipboard history with a ranked pinned list.
//!
//! Every mutating operation leaves the pinned entries numbered `0..k` with no
//! gaps or duplicates, at most `max_pinned` of them, and at most `max_items`
//! entries overall. Store failures are logged and surface only as "nothing
//! changed"; the engine never returns an error.

use std::collections::HashSet;

use uuid::Uuid;

use super::entry::{sort_for_presentation, ClipboardEntry};
use super::source::{ChangeToken, ClipboardSource};
use crate::clock::{Clock, SystemClock};
use crate::events::{Event, Notifier, NullNotifier};
use crate::storage::ClipboardStore;

pub const DEFAULT_MAX_ITEMS: usize = 100;
pub const DEFAULT_MAX_PINNED: usize = 10;
/// Pinned entries reachable by hotkey (⌘1..⌘3).
pub const PINNED_HOTKEY_SLOTS: usize = 3;
/// Recent unpinned entries reachable by hotkey (⌘4..⌘8).
pub const RECENT_HOTKEY_SLOTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardLimits {
    pub max_items: usize,
    pub max_pinned: usize,
}

impl ClipboardLimits {
    /// Clamps each limit into `1..=` its default; out-of-range values are
    /// never rejected.
    pub fn new(max_items: usize, max_pinned: usize) -> Self {
        Self {
            max_items: max_items.clamp(1, DEFAULT_MAX_ITEMS),
            max_pinned: max_pinned.clamp(1, DEFAULT_MAX_PINNED),
        }
    }
}

impl Default for ClipboardLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS, DEFAULT_MAX_PINNED)
    }
}

/// Result of one [`ClipboardHistoryEngine::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Inserted(Uuid),
    /// Content already in history; its timestamp moved to now.
    Refreshed(Uuid),
}

pub struct ClipboardHistoryEngine<S, Src, C = SystemClock> {
    store: S,
    source: Src,
    clock: C,
    limits: ClipboardLimits,
    last_token: ChangeToken,
    view: Vec<ClipboardEntry>,
    notifier: Box<dyn Notifier>,
}

impl<S, Src, C> ClipboardHistoryEngine<S, Src, C>
where
    S: ClipboardStore,
    Src: ClipboardSource,
    C: Clock,
{
    /// Content already on the clipboard at construction is not imported.
    pub fn new(store: S, source: Src, limits: ClipboardLimits, clock: C) -> Self {
        let last_token = source.change_token();
        let mut engine = Self {
            store,
            source,
            clock,
            limits,
            last_token,
            view: Vec::new(),
            notifier: Box::new(NullNotifier),
        };
        engine.refresh();
        engine
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn limits(&self) -> ClipboardLimits {
        self.limits
    }

    /// Cached entries in presentation order.
    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.view
    }

    pub fn entry(&self, id: Uuid) -> Option<&ClipboardEntry> {
        self.view.iter().find(|e| e.id == id)
    }

    /// Reload the cached view. On failure the previous view is kept.
    pub fn refresh(&mut self) {
        match self.store.clipboard_entries() {
            Ok(mut entries) => {
                sort_for_presentation(&mut entries);
                self.view = entries;
            }
            Err(e) => tracing::warn!("failed to load clipboard history: {e}"),
        }
    }

    pub fn poll(&mut self) -> PollOutcome {
        let token = self.source.change_token();
        if token == self.last_token {
            return PollOutcome::Unchanged;
        }
        self.last_token = token;

        let Some(payload) = self.source.read() else {
            return PollOutcome::Unchanged;
        };
        if payload.content.is_empty() {
            return PollOutcome::Unchanged;
        }
        let Some(mut entries) = self.load() else {
            return PollOutcome::Unchanged;
        };
        let now = self.clock.now();

        let outcome = match entries.iter_mut().find(|e| e.content == payload.content) {
            Some(existing) => {
                existing.timestamp = now;
                if let Err(e) = self.store.update_entry(existing) {
                    tracing::warn!(id = %existing.id, "failed to refresh clipboard entry: {e}");
                    return PollOutcome::Unchanged;
                }
                PollOutcome::Refreshed(existing.id)
            }
            None => {
                let entry = ClipboardEntry::new(payload.content, payload.content_type, now);
                if let Err(e) = self.store.insert_entry(&entry) {
                    tracing::warn!("failed to store clipboard entry: {e}");
                    return PollOutcome::Unchanged;
                }
                let id = entry.id;
                entries.push(entry);
                PollOutcome::Inserted(id)
            }
        };

        let touched = match outcome {
            PollOutcome::Inserted(id) | PollOutcome::Refreshed(id) => id,
            PollOutcome::Unchanged => return outcome,
        };
        self.evict_overflow(&mut entries, touched);
        tracing::debug!(?outcome, count = entries.len(), "clipboard polled");
        self.changed();
        outcome
    }

    /// Pin an unpinned entry at the top, or unpin a pinned one.
    ///
    /// Returns false when the id is unknown or the store could not be read.
    pub fn toggle_pin(&mut self, id: Uuid) -> bool {
        let Some(mut entries) = self.load() else {
            return false;
        };
        let Some(target) = entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };

        let front = if target.is_pinned {
            target.is_pinned = false;
            target.pinned_order = None;
            None
        } else {
            target.is_pinned = true;
            Some(id)
        };
        let mut dirty = renumber_pins(&mut entries, front, self.limits.max_pinned);
        dirty.insert(id);
        tracing::debug!(%id, pinned = front.is_some(), renumbered = dirty.len(), "pin toggled");

        self.persist(&entries, &dirty);
        self.changed();
        true
    }

    pub fn delete(&mut self, id: Uuid) -> bool {
        let Some(mut entries) = self.load() else {
            return false;
        };
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        match self.store.delete_entry(id) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                tracing::warn!(%id, "failed to delete clipboard entry: {e}");
                return false;
            }
        }

        let removed = entries.remove(pos);
        if removed.is_pinned {
            let dirty = renumber_pins(&mut entries, None, self.limits.max_pinned);
            self.persist(&entries, &dirty);
        }
        self.changed();
        true
    }

    /// Remove every entry, pinned or not. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        match self.store.clear_entries() {
            Ok(removed) => {
                self.changed();
                removed
            }
            Err(e) => {
                tracing::warn!("failed to clear clipboard history: {e}");
                0
            }
        }
    }

    /// Case-insensitive substring match over content, in presentation order.
    pub fn search(&self, query: &str) -> Vec<ClipboardEntry> {
        if query.is_empty() {
            return self.view.clone();
        }
        let needle = query.to_lowercase();
        self.view
            .iter()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn pinned_slot(&self, slot: usize) -> Option<&ClipboardEntry> {
        if slot >= PINNED_HOTKEY_SLOTS {
            return None;
        }
        self.view.iter().filter(|e| e.is_pinned).nth(slot)
    }

    pub fn recent_slot(&self, slot: usize) -> Option<&ClipboardEntry> {
        if slot >= RECENT_HOTKEY_SLOTS {
            return None;
        }
        self.view.iter().filter(|e| !e.is_pinned).nth(slot)
    }

    /// Hotkey label for an entry currently occupying a slot, e.g. `⌘2`.
    pub fn hotkey_hint(&self, id: Uuid) -> Option<String> {
        if let Some(slot) = (0..PINNED_HOTKEY_SLOTS)
            .find(|&slot| self.pinned_slot(slot).is_some_and(|e| e.id == id))
        {
            return Some(format!("⌘{}", slot + 1));
        }
        (0..RECENT_HOTKEY_SLOTS)
            .find(|&slot| self.recent_slot(slot).is_some_and(|e| e.id == id))
            .map(|slot| format!("⌘{}", slot + 1 + PINNED_HOTKEY_SLOTS))
    }

    /// Put an entry's content back on the clipboard.
    ///
    /// The next poll sees the change and moves the entry to the top.
    pub fn copy_entry(&mut self, id: Uuid) -> bool {
        let Some(content) = self.entry(id).map(|e| e.content.clone()) else {
            return false;
        };
        self.source.write(&content)
    }

    fn load(&self) -> Option<Vec<ClipboardEntry>> {
        match self.store.clipboard_entries() {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::warn!("failed to load clipboard history: {e}");
                None
            }
        }
    }

    /// Drop the oldest entries until within `max_items`. Never drops `keep`.
    fn evict_overflow(&mut self, entries: &mut Vec<ClipboardEntry>, keep: Uuid) {
        let mut evicted_pinned = false;
        while entries.len() > self.limits.max_items {
            let Some(pos) = entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.id != keep)
                .min_by_key(|(_, e)| e.timestamp)
                .map(|(pos, _)| pos)
            else {
                break;
            };
            let id = entries[pos].id;
            if let Err(e) = self.store.delete_entry(id) {
                tracing::warn!(%id, "failed to evict clipboard entry: {e}");
                break;
            }
            let evicted = entries.remove(pos);
            evicted_pinned |= evicted.is_pinned;
            tracing::debug!(%id, "evicted oldest clipboard entry");
        }
        if evicted_pinned {
            let dirty = renumber_pins(entries, None, self.limits.max_pinned);
            self.persist(entries, &dirty);
        }
    }

    fn persist(&mut self, entries: &[ClipboardEntry], dirty: &HashSet<Uuid>) {
        for entry in entries.iter().filter(|e| dirty.contains(&e.id)) {
            if let Err(e) = self.store.update_entry(entry) {
                tracing::warn!(id = %entry.id, "failed to update clipboard entry: {e}");
            }
        }
    }

    fn changed(&mut self) {
        self.refresh();
        self.notifier.notify(&Event::ClipboardChanged {
            at: self.clock.now(),
        });
    }
}

/// Renumber pinned entries densely from 0, optionally moving `front` to the top.
///
/// Pinned entries past `max_pinned` are unpinned; unpinned entries lose any
/// stray order. Returns the ids whose pin state changed.
fn renumber_pins(
    entries: &mut [ClipboardEntry],
    front: Option<Uuid>,
    max_pinned: usize,
) -> HashSet<Uuid> {
    let mut dirty = HashSet::new();

    let mut pinned: Vec<usize> = (0..entries.len()).filter(|&i| entries[i].is_pinned).collect();
    pinned.sort_by_key(|&i| (Some(entries[i].id) != front, entries[i].pin_rank()));

    for (rank, &i) in pinned.iter().enumerate() {
        let entry = &mut entries[i];
        let before = (entry.is_pinned, entry.pinned_order);
        if rank < max_pinned {
            entry.pinned_order = Some(rank as u32);
        } else {
            entry.is_pinned = false;
            entry.pinned_order = None;
        }
        if before != (entry.is_pinned, entry.pinned_order) {
            dirty.insert(entry.id);
        }
    }

    for entry in entries.iter_mut().filter(|e| !e.is_pinned && e.pinned_order.is_some()) {
        entry.pinned_order = None;
        dirty.insert(entry.id);
    }
    dirty
}
