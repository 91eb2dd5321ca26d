use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::chapter::{Chapter, ChapterId};
use crate::chapters::ChapterList;
use crate::timecode::{ms_to_seconds, seconds_to_ms};

/// Index of the chapter playing at `position_ms`: the last unflagged chapter
/// starting at or before it. Negative positions count as 0.
pub fn active_index(chapters: &[Chapter], position_ms: i64) -> Option<usize> {
    let position = position_ms.max(0) as u64;
    chapters
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_valid() && c.start <= position)
        .map(|(i, _)| i)
        .last()
}

pub fn active_chapter(chapters: &[Chapter], position_ms: i64) -> Option<&Chapter> {
    active_index(chapters, position_ms).map(|i| &chapters[i])
}

/// One entry of the player's chapter track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

impl Cue {
    pub fn start_seconds(&self) -> f64 {
        ms_to_seconds(self.start_ms)
    }

    pub fn end_seconds(&self) -> f64 {
        ms_to_seconds(self.end_ms)
    }
}

/// Builds the cue track shown on the player timeline. Flagged chapters are
/// left out; with no chapters at all a single `placeholder` cue covers the
/// whole track.
pub fn cue_track(chapters: &[Chapter], duration_ms: Option<u64>, placeholder: &str) -> Vec<Cue> {
    if chapters.is_empty() {
        return vec![Cue {
            start_ms: 0,
            end_ms: duration_ms.unwrap_or(0),
            text: placeholder.to_string(),
        }];
    }

    chapters
        .iter()
        .filter(|c| c.is_valid())
        .map(|c| Cue {
            start_ms: c.start,
            end_ms: c.end,
            text: c.title.clone(),
        })
        .collect()
}

/// Follows the media player's position. Reads the chapter list but never
/// changes it.
pub struct PlayerBinding {
    chapters: Rc<ChapterList>,
    position_ms: Cell<i64>,
}

impl PlayerBinding {
    pub fn new(chapters: Rc<ChapterList>) -> Self {
        Self {
            chapters,
            position_ms: Cell::new(0),
        }
    }

    /// Called on the player's time-update event.
    pub fn on_time_update(&self, seconds: f64) {
        self.position_ms.set(seconds_to_ms(seconds));
    }

    pub fn position_ms(&self) -> i64 {
        self.position_ms.get()
    }

    pub fn active_chapter(&self) -> Option<Chapter> {
        active_chapter(&self.chapters.get_chapters(), self.position_ms.get()).cloned()
    }

    /// Where the player should seek to play `id`, in seconds.
    pub fn seek_target(&self, id: ChapterId) -> Option<f64> {
        self.chapters.chapter(id).map(|c| ms_to_seconds(c.start))
    }

    pub fn cues(&self, placeholder: &str) -> Vec<Cue> {
        cue_track(
            &self.chapters.get_chapters(),
            self.chapters.duration(),
            placeholder,
        )
    }

    /// Start for a chapter dropped at the playhead. Without sub-second
    /// chapters in the list the position is rounded to the nearest second.
    pub fn playhead_start(&self) -> i64 {
        let position = self.position_ms.get();
        if self.chapters.uses_ms() {
            position
        } else {
            (position as f64 / 1000.0).round() as i64 * 1000
        }
    }
}
