use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque chapter identifier, stable for the lifetime of the chapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChapterId(u64);

impl ChapterId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a chapter is flagged. Faults never block editing; flagged chapters
/// stay in the list but are left out of cue tracks and tag exports.
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterFault {
    #[error("line has no leading timestamp: {line:?}")]
    Unparseable { line: String },

    #[error("chapter title is empty")]
    EmptyTitle,

    #[error("another chapter already starts at {start_ms} ms")]
    DuplicateStart { start_ms: u64 },

    #[error("start {requested_ms} ms is outside the track, moved to {clamped_ms} ms")]
    OutOfRange { requested_ms: i64, clamped_ms: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    /// Start in milliseconds.
    pub start: u64,
    /// Derived end in milliseconds: the next later start, or the track duration.
    pub end: u64,
    pub title: String,
    pub error: Option<ChapterFault>,
}

impl Chapter {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn duration_ms(&self) -> u64 {
        self.end - self.start
    }

    /// Half-open `[start, end)` containment.
    pub fn contains(&self, position_ms: u64) -> bool {
        position_ms >= self.start && position_ms < self.end
    }
}

/// Partial update for [`crate::ChapterList::update_chapter`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChapterPatch {
    pub title: Option<String>,
    pub start: Option<i64>,
}

impl ChapterPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            start: None,
        }
    }

    pub fn start(start_ms: i64) -> Self {
        Self {
            title: None,
            start: Some(start_ms),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_start(mut self, start_ms: i64) -> Self {
        self.start = Some(start_ms);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start.is_none()
    }
}

/// Collapses a title onto one line: line breaks become single spaces and the
/// ends are trimmed. Every stored title goes through here so the text view
/// keeps one line per chapter.
pub fn single_line_title(title: &str) -> String {
    title
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
