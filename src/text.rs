//! Keeps the chapter textarea and the chapter list in step.
//!
//! Edits stay in the buffer until they are committed; the list re-renders the
//! buffer after changes it did not receive from the text itself.

use std::cell::RefCell;
use std::rc::Rc;

use crate::chapter::Chapter;
use crate::chapters::{ChapterList, render_list};
use crate::events::ListenerId;
use crate::player::active_index;

#[derive(Debug, Default)]
struct Buffer {
    text: String,
    revision: u64,
    focused: bool,
    // edited since the last commit
    dirty: bool,
    // text equals the rendered list, so buffer lines are chapter indices
    canonical: bool,
    committing: bool,
    redraw_pending: bool,
}

impl Buffer {
    fn redraw(&mut self, chapters: &[Chapter]) {
        let text = render_list(chapters);
        if text != self.text {
            self.text = text;
            self.revision += 1;
        }
        self.canonical = true;
        self.redraw_pending = false;
    }
}

pub struct TextSync {
    chapters: Rc<ChapterList>,
    buffer: Rc<RefCell<Buffer>>,
    listener: ListenerId,
}

impl TextSync {
    pub fn new(chapters: Rc<ChapterList>) -> Self {
        let buffer = Rc::new(RefCell::new(Buffer::default()));
        buffer.borrow_mut().redraw(&chapters.get_chapters());

        let listener = {
            let buffer = buffer.clone();
            chapters.subscribe(move |chapters: &[Chapter]| {
                let mut buffer = buffer.borrow_mut();
                if buffer.committing {
                    return;
                }
                if buffer.focused && buffer.dirty {
                    log::debug!("Deferring chapter text redraw until the editor loses focus");
                    buffer.redraw_pending = true;
                    return;
                }
                buffer.redraw(chapters);
            })
        };

        Self {
            chapters,
            buffer,
            listener,
        }
    }

    /// Current textarea contents.
    pub fn text(&self) -> String {
        self.buffer.borrow().text.clone()
    }

    /// Bumped whenever the buffer is rewritten from the chapter list, so a
    /// view knows when to redraw.
    pub fn revision(&self) -> u64 {
        self.buffer.borrow().revision
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer.borrow().dirty
    }

    pub fn focus(&self) {
        self.buffer.borrow_mut().focused = true;
    }

    /// A keystroke-level edit. Nothing reaches the chapter list until commit.
    pub fn input(&self, text: impl Into<String>) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.text = text.into();
        buffer.dirty = true;
        buffer.canonical = false;
    }

    /// Applies the buffer to the chapter list without touching the buffer, so
    /// the caret and selection survive. Returns false when there was nothing
    /// to apply.
    pub fn commit(&self) -> bool {
        let text = {
            let mut buffer = self.buffer.borrow_mut();
            if !buffer.dirty {
                return false;
            }
            buffer.committing = true;
            buffer.text.clone()
        };

        self.chapters.replace_from_text(&text);
        let rendered = self.chapters.export_as_list();

        let mut buffer = self.buffer.borrow_mut();
        buffer.committing = false;
        buffer.dirty = false;
        buffer.canonical = buffer.text == rendered;
        // the commit supersedes any redraw deferred while typing
        buffer.redraw_pending = false;
        true
    }

    /// Commits pending edits and rewrites the buffer in canonical form.
    pub fn blur(&self) -> bool {
        self.buffer.borrow_mut().focused = false;
        let committed = self.commit();

        let mut buffer = self.buffer.borrow_mut();
        if committed || buffer.redraw_pending || !buffer.canonical {
            buffer.redraw(&self.chapters.get_chapters());
        }
        committed
    }

    /// Line to highlight for the playback position, if the buffer still
    /// matches the chapter list line for line.
    pub fn highlighted_line(&self, position_ms: i64) -> Option<usize> {
        if !self.buffer.borrow().canonical {
            return None;
        }
        active_index(&self.chapters.get_chapters(), position_ms)
    }
}

impl Drop for TextSync {
    fn drop(&mut self) {
        self.chapters.unsubscribe(self.listener);
    }
}
