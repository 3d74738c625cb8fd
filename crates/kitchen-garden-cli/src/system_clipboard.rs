//! The OS clipboard as a [`ClipboardSource`].

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use kitchen_garden_core::{ChangeToken, ClipboardPayload, ClipboardSource};

/// Backed by `arboard`. The OS exposes no portable change counter, so the
/// change token is a hash of the current text.
pub struct SystemClipboard {
    board: RefCell<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, arboard::Error> {
        Ok(Self {
            board: RefCell::new(arboard::Clipboard::new()?),
        })
    }

    fn text(&self) -> Option<String> {
        self.board.borrow_mut().get_text().ok()
    }
}

fn token_for(text: &str) -> ChangeToken {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    ChangeToken(hasher.finish())
}

impl ClipboardSource for SystemClipboard {
    /// Reads and hashes the full clipboard text on every call, so an
    /// unchanged token saves no OS reads here. A changed token costs a
    /// second read in [`ClipboardSource::read`].
    fn change_token(&self) -> ChangeToken {
        self.text()
            .map_or_else(ChangeToken::default, |text| token_for(&text))
    }

    fn read(&mut self) -> Option<ClipboardPayload> {
        self.text().map(ClipboardPayload::text)
    }

    fn write(&mut self, content: &str) -> bool {
        match self.board.get_mut().set_text(content.to_owned()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("failed to write system clipboard: {e}");
                false
            }
        }
    }
}
