use std::cmp::{Ordering, Reverse};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest preview shown before truncation, in characters.
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Url,
    Image,
    File,
}

impl ContentType {
    /// Classify a text payload. Only `http://` and `https://` prefixes count as URLs.
    pub fn infer(content: &str) -> Self {
        if content.starts_with("http://") || content.starts_with("https://") {
            ContentType::Url
        } else {
            ContentType::Text
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContentType::Text => "Text",
            ContentType::Url => "URL",
            ContentType::Image => "Image",
            ContentType::File => "File",
        }
    }

    /// Whether the payload can be shown as text.
    pub fn is_displayable(&self) -> bool {
        matches!(self, ContentType::Text | ContentType::Url)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Url => "url",
            ContentType::Image => "image",
            ContentType::File => "file",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentType::Text),
            "url" => Ok(ContentType::Url),
            "image" => Ok(ContentType::Image),
            "file" => Ok(ContentType::File),
            other => Err(format!("unknown content type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    pub id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub content_type: ContentType,
    pub is_pinned: bool,
    /// Rank among pinned entries, 0 is the top. `None` whenever unpinned.
    pub pinned_order: Option<u32>,
}

impl ClipboardEntry {
    pub fn new(content: impl Into<String>, content_type: ContentType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            timestamp,
            content_type,
            is_pinned: false,
            pinned_order: None,
        }
    }

    pub fn preview(&self) -> String {
        if self.content.chars().count() > PREVIEW_CHARS {
            let head: String = self.content.chars().take(PREVIEW_CHARS).collect();
            format!("{head}...")
        } else {
            self.content.clone()
        }
    }

    /// Sort key among pinned entries. A pinned entry missing its order ranks last.
    pub(crate) fn pin_rank(&self) -> (u32, Reverse<DateTime<Utc>>) {
        (self.pinned_order.unwrap_or(u32::MAX), Reverse(self.timestamp))
    }
}

/// Presentation order: pinned first by ascending rank, then unpinned newest first.
pub fn presentation_order(a: &ClipboardEntry, b: &ClipboardEntry) -> Ordering {
    match (a.is_pinned, b.is_pinned) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => a.pin_rank().cmp(&b.pin_rank()),
        (false, false) => b.timestamp.cmp(&a.timestamp),
    }
}

pub fn sort_for_presentation(entries: &mut [ClipboardEntry]) {
    entries.sort_by(presentation_order);
}
