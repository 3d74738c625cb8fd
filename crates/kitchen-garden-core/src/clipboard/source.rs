//! Clipboard sources the history engine polls.

use std::sync::{Arc, Mutex};

use super::entry::ContentType;

/// Opaque value that changes whenever the source's content changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChangeToken(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub content: String,
    pub content_type: ContentType,
}

impl ClipboardPayload {
    /// Wrap text, inferring its content type.
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        let content_type = ContentType::infer(&content);
        Self {
            content,
            content_type,
        }
    }
}

pub trait ClipboardSource {
    /// Cheap check the engine makes on every poll.
    fn change_token(&self) -> ChangeToken;

    /// Read the current payload. `None` when there is no text on the clipboard.
    fn read(&mut self) -> Option<ClipboardPayload>;

    /// Put text on the clipboard. Returns false if the source refused it.
    fn write(&mut self, content: &str) -> bool;
}

#[derive(Debug, Default)]
struct MemoryClipboardInner {
    token: u64,
    content: Option<String>,
    reads: usize,
}

/// In-process clipboard. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    inner: Arc<Mutex<MemoryClipboardInner>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents, bumping the change token.
    pub fn copy(&self, content: impl Into<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.token += 1;
            inner.content = Some(content.into());
        }
    }

    /// How many times `read` has been called.
    pub fn reads(&self) -> usize {
        self.inner.lock().map(|inner| inner.reads).unwrap_or(0)
    }
}

impl ClipboardSource for MemoryClipboard {
    fn change_token(&self) -> ChangeToken {
        ChangeToken(self.inner.lock().map(|inner| inner.token).unwrap_or(0))
    }

    fn read(&mut self) -> Option<ClipboardPayload> {
        let mut inner = self.inner.lock().ok()?;
        inner.reads += 1;
        inner.content.clone().map(ClipboardPayload::text)
    }

    fn write(&mut self, content: &str) -> bool {
        self.copy(content);
        true
    }
}
