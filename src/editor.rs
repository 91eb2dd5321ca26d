use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;

use crate::chapter::Chapter;
use crate::chapters::ChapterList;
use crate::config::EditorConfig;
use crate::export::{EpisodeTags, ExportFormat, TagFrame, export, tag_frames};
use crate::mkv::parse_matroska_xml;
use crate::paste::import_clipboard;
use crate::player::{Cue, PlayerBinding};
use crate::session::Session;
use crate::text::TextSync;
use crate::timecode::seconds_to_ms;

/// One editing session: owns the chapter list and wires the text view and
/// the player to it. UI events enter here.
pub struct ChapterEditor {
    config: EditorConfig,
    chapters: Rc<ChapterList>,
    text: TextSync,
    player: PlayerBinding,
    source: Option<PathBuf>,
    tags: EpisodeTags,
    // changed since the last load or save
    modified: Rc<Cell<bool>>,
}

impl ChapterEditor {
    pub fn new(config: EditorConfig) -> Self {
        let chapters = Rc::new(ChapterList::new());
        let text = TextSync::new(chapters.clone());
        let player = PlayerBinding::new(chapters.clone());
        let modified = Rc::new(Cell::new(false));
        {
            let modified = modified.clone();
            chapters.subscribe(move |_: &[Chapter]| modified.set(true));
        }
        Self {
            config,
            chapters,
            text,
            player,
            source: None,
            tags: EpisodeTags::default(),
            modified,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn chapters(&self) -> &Rc<ChapterList> {
        &self.chapters
    }

    pub fn text(&self) -> &TextSync {
        &self.text
    }

    pub fn player(&self) -> &PlayerBinding {
        &self.player
    }

    /// Whether chapters or tags changed since the last load or save, i.e.
    /// whether closing now would lose work.
    pub fn is_modified(&self) -> bool {
        self.modified.get()
    }

    pub fn tags(&self) -> &EpisodeTags {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: EpisodeTags) {
        if self.tags != tags {
            self.tags = tags;
            self.modified.set(true);
        }
    }

    /// The player reported a new media length. Players report NaN or zero
    /// before the metadata has loaded; those are ignored.
    pub fn on_duration_change(&self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            log::debug!("Ignoring unusable track duration {}", seconds);
            return;
        }
        let ms = seconds_to_ms(seconds).max(0) as u64;
        // a new length is not an edit
        let modified = self.modified.get();
        self.chapters.set_duration(ms);
        self.modified.set(modified);
    }

    pub fn on_time_update(&self, seconds: f64) {
        self.player.on_time_update(seconds);
    }

    /// The "add chapter" button: a chapter with the default title at the
    /// playhead.
    pub fn add_chapter_at_playhead(&self) -> Chapter {
        self.chapters
            .add_chapter(&self.config.default_title, self.player.playhead_start())
    }

    /// A new media file was loaded with whatever chapters it already had.
    pub fn load_chapters<S: AsRef<str>>(
        &mut self,
        source: Option<PathBuf>,
        chapters: impl IntoIterator<Item = (i64, S)>,
    ) {
        self.source = source;
        self.chapters.replace_all(chapters);
        self.modified.set(false);
    }

    pub fn load_matroska(&mut self, source: Option<PathBuf>, xml: &str) -> Result<()> {
        let chapters = parse_matroska_xml(xml)?;
        self.load_chapters(source, chapters);
        Ok(())
    }

    /// Clipboard paste into the text view. Applied to the list on blur.
    /// Returns false, leaving the text alone, when the clipboard is malformed.
    pub fn paste(&self, clipboard: &str) -> bool {
        match import_clipboard(clipboard, &self.config.paste) {
            Some(text) => {
                self.text.input(text);
                true
            }
            None => false,
        }
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.player.cues(&self.config.placeholder_cue)
    }

    pub fn export(&self, format: ExportFormat) -> Result<String> {
        export(&self.chapters.get_chapters(), self.chapters.duration(), format)
    }

    /// Text for the "copy" action, in the configured format.
    pub fn copy_text(&self) -> Result<String> {
        self.export(self.config.copy_format)
    }

    pub fn tag_frames(&self) -> Vec<TagFrame> {
        tag_frames(&self.chapters.get_chapters())
    }

    pub fn save_session(&self, path: impl AsRef<Path>) -> Result<()> {
        Session::capture(&self.chapters, self.source.clone())
            .with_tags(self.tags.clone())
            .save(path)?;
        self.modified.set(false);
        Ok(())
    }

    pub fn load_session(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let session = Session::load(path)?;
        session.restore(&self.chapters);
        self.source = session.source;
        self.tags = session.tags;
        self.modified.set(false);
        Ok(())
    }
}

impl Default for ChapterEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
