use std::cell::RefCell;
use std::rc::Rc;

use crate::chapter::{Chapter, ChapterFault, ChapterId, ChapterPatch, single_line_title};
use crate::events::{EventBus, ListenerId};
use crate::timecode::{format_timestamp, needs_ms, split_line};

/// How far apart two starts may be for a reparsed line to keep a chapter's id.
/// The text view always round-trips through the formatter, so only exact
/// matches count.
pub const RECONCILE_TOLERANCE_MS: u64 = 0;

#[derive(Clone, Debug)]
struct Entry {
    id: ChapterId,
    // insertion order, breaks ties between equal starts
    ordinal: u64,
    // as requested; the duration clamp is applied to the snapshot only
    start: u64,
    title: String,
    // only faults tied to how the entry was created; the rest are derived
    fault: Option<ChapterFault>,
}

impl Entry {
    fn is_unparseable(&self) -> bool {
        matches!(self.fault, Some(ChapterFault::Unparseable { .. }))
    }
}

#[derive(Debug)]
struct State {
    entries: Vec<Entry>,
    duration: Option<u64>,
    next_id: u64,
    next_ordinal: u64,
    snapshot: Rc<[Chapter]>,
}

impl State {
    fn new(duration: Option<u64>) -> Self {
        Self {
            entries: Vec::new(),
            duration,
            next_id: 0,
            next_ordinal: 0,
            snapshot: Rc::from(Vec::new()),
        }
    }

    fn mint_id(&mut self) -> ChapterId {
        let id = ChapterId::new(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .expect("chapter id space exhausted");
        id
    }

    fn next_ordinal(&mut self) -> u64 {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        ordinal
    }

    fn push(&mut self, start_ms: i64, title: &str) -> ChapterId {
        let id = self.mint_id();
        let ordinal = self.next_ordinal();
        let (start, fault) = clamp_start(start_ms);
        if let Some(fault) = &fault {
            log::warn!("Chapter {}: {}", id, fault);
        }
        if let Some(duration) = self.duration.filter(|d| start > *d) {
            log::warn!("Chapter {} starts at {} ms, past the {} ms track", id, start, duration);
        }
        self.entries.push(Entry {
            id,
            ordinal,
            start,
            title: single_line_title(title),
            fault,
        });
        id
    }

    fn find(&self, id: ChapterId) -> Option<Chapter> {
        self.snapshot.iter().find(|c| c.id == id).cloned()
    }

    /// Start as published: the stored start clamped to the known duration.
    fn shown_start(&self, entry: &Entry) -> u64 {
        match self.duration {
            Some(duration) => entry.start.min(duration),
            None => entry.start,
        }
    }

    /// Re-establishes every invariant and rebuilds the published snapshot.
    ///
    /// Stored starts are never rewritten here, so shrinking the duration and
    /// growing it back restores every chapter where it was.
    fn normalize(&mut self) {
        self.entries.sort_by_key(|e| (e.start, e.ordinal));

        let starts: Vec<u64> = self.entries.iter().map(|e| self.shown_start(e)).collect();
        let count = starts.len();
        let mut ends = vec![0; count];
        let mut later: Option<u64> = None;
        for i in (0..count).rev() {
            let start = starts[i];
            if let Some(&next) = starts.get(i + 1) {
                if next > start {
                    later = Some(next);
                }
            }
            let end = match (later, self.duration) {
                (Some(next), Some(duration)) => next.min(duration),
                (Some(next), None) => next,
                (None, Some(duration)) => duration,
                (None, None) => start,
            };
            ends[i] = end.max(start);
        }

        let mut chapters = Vec::with_capacity(count);
        // start of the last valid chapter; flagged ones never claim a start
        let mut previous_start: Option<u64> = None;
        for ((entry, start), end) in self.entries.iter().zip(starts).zip(ends) {
            let error = match &entry.fault {
                Some(fault) => Some(fault.clone()),
                None if start < entry.start => Some(ChapterFault::OutOfRange {
                    requested_ms: i64::try_from(entry.start).unwrap_or(i64::MAX),
                    clamped_ms: start,
                }),
                None if entry.title.is_empty() => Some(ChapterFault::EmptyTitle),
                None if previous_start == Some(start) => {
                    Some(ChapterFault::DuplicateStart { start_ms: start })
                }
                None => None,
            };
            if error.is_none() {
                previous_start = Some(start);
            }
            chapters.push(Chapter {
                id: entry.id,
                start,
                end,
                title: entry.title.clone(),
                error,
            });
        }
        self.snapshot = Rc::from(chapters);
    }
}

// Negative starts are clamped for good; the upper bound moves with the
// duration and is applied in `State::normalize`.
fn clamp_start(start_ms: i64) -> (u64, Option<ChapterFault>) {
    match u64::try_from(start_ms) {
        Ok(start) => (start, None),
        Err(_) => {
            let fault = ChapterFault::OutOfRange {
                requested_ms: start_ms,
                clamped_ms: 0,
            };
            (0, Some(fault))
        }
    }
}

/// One parsed line of the text view.
#[derive(Debug)]
struct Candidate {
    start: u64,
    title: String,
    fault: Option<ChapterFault>,
}

fn parse_lines(text: &str) -> Vec<Candidate> {
    let mut inherited = 0;
    text.lines()
        .map(|line| match split_line(line) {
            Some((start, title)) => {
                inherited = start;
                Candidate {
                    start,
                    title: title.to_string(),
                    fault: None,
                }
            }
            None => Candidate {
                start: inherited,
                title: line.trim().to_string(),
                fault: Some(ChapterFault::Unparseable {
                    line: line.trim_end().to_string(),
                }),
            },
        })
        .collect()
}

/// Picks the previous chapter each candidate line continues, by start time.
///
/// Preference: the chapter on the same line, then an unclaimed chapter with
/// the same start and title, then the unclaimed chapter with the same start
/// nearest in line position.
fn reconcile(previous: &[Chapter], candidates: &[Candidate]) -> Vec<Option<ChapterId>> {
    let same_time = |a: u64, b: u64| a.abs_diff(b) <= RECONCILE_TOLERANCE_MS;
    let mut claimed = vec![false; previous.len()];
    let mut ids = vec![None; candidates.len()];

    for (i, candidate) in candidates.iter().enumerate() {
        if let Some(entry) = previous.get(i) {
            if same_time(entry.start, candidate.start) {
                claimed[i] = true;
                ids[i] = Some(entry.id);
            }
        }
    }

    for (i, candidate) in candidates.iter().enumerate() {
        if ids[i].is_some() {
            continue;
        }
        let found = previous.iter().enumerate().position(|(j, entry)| {
            !claimed[j] && same_time(entry.start, candidate.start) && entry.title == candidate.title
        });
        if let Some(j) = found {
            claimed[j] = true;
            ids[i] = Some(previous[j].id);
        }
    }

    for (i, candidate) in candidates.iter().enumerate() {
        if ids[i].is_some() {
            continue;
        }
        let nearest = previous
            .iter()
            .enumerate()
            .filter(|(j, entry)| !claimed[*j] && same_time(entry.start, candidate.start))
            .min_by_key(|(j, _)| j.abs_diff(i))
            .map(|(j, _)| j);
        if let Some(j) = nearest {
            claimed[j] = true;
            ids[i] = Some(previous[j].id);
        }
    }

    ids
}

/// Renders chapters in the editor's line format, one chapter per line.
/// Milliseconds are written only when some start needs them.
pub fn render_list(chapters: &[Chapter]) -> String {
    let with_ms = needs_ms(chapters.iter().map(|c| c.start));
    chapters
        .iter()
        .map(|chapter| match &chapter.error {
            Some(ChapterFault::Unparseable { line }) => line.clone(),
            _ => {
                let timestamp = format_timestamp(chapter.start, with_ms);
                if chapter.title.is_empty() {
                    timestamp
                } else {
                    format!("{} {}", timestamp, chapter.title)
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The ordered, observable list of chapter markers for one editing session.
///
/// All methods take `&self`; share the list with `Rc` and mutate it only
/// through these methods. Listeners registered with [`ChapterList::subscribe`]
/// run after every change, see [`crate::events`] for the delivery rules.
pub struct ChapterList {
    state: RefCell<State>,
    events: EventBus<[Chapter]>,
}

impl Default for ChapterList {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterList {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(State::new(None)),
            events: EventBus::new(),
        }
    }

    pub fn with_duration(duration_ms: u64) -> Self {
        Self {
            state: RefCell::new(State::new(Some(duration_ms))),
            events: EventBus::new(),
        }
    }

    /// Read-only snapshot of the chapters in time order.
    pub fn get_chapters(&self) -> Rc<[Chapter]> {
        self.state.borrow().snapshot.clone()
    }

    pub fn chapter(&self, id: ChapterId) -> Option<Chapter> {
        self.state.borrow().find(id)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Track length in milliseconds, `None` until the player reports it.
    pub fn duration(&self) -> Option<u64> {
        self.state.borrow().duration
    }

    pub fn uses_ms(&self) -> bool {
        needs_ms(self.get_chapters().iter().map(|c| c.start))
    }

    /// Records the media length. Starts past the new end are shown clamped
    /// and flagged until the length grows back past them.
    pub fn set_duration(&self, duration_ms: u64) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.duration == Some(duration_ms) {
                return false;
            }
            log::debug!("Track duration is now {} ms", duration_ms);
            state.duration = Some(duration_ms);
            state.normalize();
        }
        self.notify();
        true
    }

    /// Inserts a chapter at its time-sorted position.
    ///
    /// A start outside `[0, duration]` is clamped and the chapter is flagged
    /// rather than rejected.
    pub fn add_chapter(&self, title: &str, start_ms: i64) -> Chapter {
        let added = {
            let mut state = self.state.borrow_mut();
            let id = state.push(start_ms, title);
            state.normalize();
            log::debug!("Added chapter {} at {} ms", id, start_ms);
            state.find(id)
        };
        self.notify();
        added.expect("freshly added chapter is in the snapshot")
    }

    /// Applies a partial update. Unknown ids and patches that change nothing
    /// are ignored without notifying.
    pub fn update_chapter(&self, id: ChapterId, patch: ChapterPatch) -> Option<Chapter> {
        if patch.is_empty() {
            return self.chapter(id);
        }
        let updated = {
            let mut state = self.state.borrow_mut();
            let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
                log::debug!("Ignoring update of unknown chapter {}", id);
                return None;
            };

            let mut changed = false;
            if entry.is_unparseable() {
                entry.fault = None;
                changed = true;
            }
            if let Some(title) = patch.title {
                let title = single_line_title(&title);
                if entry.title != title {
                    entry.title = title;
                    changed = true;
                }
            }
            if let Some(start_ms) = patch.start {
                let (start, fault) = clamp_start(start_ms);
                if entry.start != start {
                    entry.start = start;
                    changed = true;
                }
                if entry.fault != fault {
                    if let Some(fault) = &fault {
                        log::warn!("Chapter {}: {}", id, fault);
                    }
                    entry.fault = fault;
                    changed = true;
                }
            }

            if !changed {
                return state.find(id);
            }
            state.normalize();
            state.find(id)
        };
        self.notify();
        updated
    }

    /// Moves a chapter to a new start, keeping its id.
    pub fn move_chapter(&self, id: ChapterId, start_ms: i64) -> Option<Chapter> {
        self.update_chapter(id, ChapterPatch::start(start_ms))
    }

    /// Removes a chapter. Unknown ids are a no-op.
    pub fn remove_chapter(&self, id: ChapterId) -> bool {
        {
            let mut state = self.state.borrow_mut();
            let Some(pos) = state.entries.iter().position(|e| e.id == id) else {
                log::debug!("Ignoring removal of unknown chapter {}", id);
                return false;
            };
            state.entries.remove(pos);
            state.normalize();
        }
        self.notify();
        true
    }

    /// Rebuilds the list from the editor text, keeping the ids of chapters
    /// whose start did not change. Notifies once for the whole batch.
    pub fn replace_from_text(&self, text: &str) {
        {
            let mut state = self.state.borrow_mut();
            let candidates = parse_lines(text);
            let ids = reconcile(&state.snapshot, &candidates);
            let kept = ids.iter().filter(|id| id.is_some()).count();

            let mut entries = Vec::with_capacity(candidates.len());
            for (candidate, id) in candidates.into_iter().zip(ids) {
                let id = match id {
                    Some(id) => id,
                    None => state.mint_id(),
                };
                let ordinal = state.next_ordinal();
                entries.push(Entry {
                    id,
                    ordinal,
                    start: candidate.start,
                    title: candidate.title,
                    fault: candidate.fault,
                });
            }
            log::debug!(
                "Reparsed {} lines, {} kept their chapter id",
                entries.len(),
                kept
            );
            state.entries = entries;
            state.normalize();
        }
        self.notify();
    }

    /// Replaces every chapter with fresh ones, e.g. when a new file is loaded.
    pub fn replace_all<S: AsRef<str>>(&self, chapters: impl IntoIterator<Item = (i64, S)>) {
        {
            let mut state = self.state.borrow_mut();
            state.entries.clear();
            for (start_ms, title) in chapters {
                state.push(start_ms, title.as_ref());
            }
            state.normalize();
            log::debug!("Replaced chapter list with {} chapters", state.entries.len());
        }
        self.notify();
    }

    /// The canonical text form; [`ChapterList::replace_from_text`] reads it back.
    pub fn export_as_list(&self) -> String {
        render_list(&self.get_chapters())
    }

    pub fn subscribe(&self, listener: impl FnMut(&[Chapter]) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    fn notify(&self) {
        self.events.publish(|| self.get_chapters());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn scenario() -> ChapterList {
        let list = ChapterList::with_duration(200_000);
        list.add_chapter("Intro", 0);
        list.add_chapter("Chapter 2", 90_000);
        list
    }

    fn notifications(list: &ChapterList) -> Rc<RefCell<Vec<usize>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        list.subscribe(move |chapters: &[Chapter]| s.borrow_mut().push(chapters.len()));
        seen
    }

    fn pairs(list: &ChapterList) -> Vec<(u64, String)> {
        list.get_chapters()
            .iter()
            .map(|c| (c.start, c.title.clone()))
            .collect()
    }

    #[test]
    fn test_export_as_list() {
        let list = scenario();
        assert_eq!(list.export_as_list(), "00:00:00 Intro\n00:01:30 Chapter 2");
        assert_eq!(list.export_as_list(), list.export_as_list());
    }

    #[test]
    fn test_sorted_after_adds_and_moves() {
        let list = ChapterList::with_duration(600_000);
        let late = list.add_chapter("Late", 300_000);
        list.add_chapter("Early", 10_000);
        list.add_chapter("Middle", 120_000);
        list.move_chapter(late.id, 5_000);
        list.update_chapter(late.id, ChapterPatch::start(400_000).with_title("Late again"));

        let starts: Vec<u64> = list.get_chapters().iter().map(|c| c.start).collect();
        assert_eq!(starts, vec![10_000, 120_000, 400_000]);
        assert_eq!(list.chapter(late.id).map(|c| c.title), Some("Late again".to_string()));
    }

    #[test]
    fn test_derived_end() {
        let list = scenario();
        list.add_chapter("Outro", 180_000);
        let chapters = list.get_chapters();
        for pair in chapters.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(chapters.last().map(|c| c.end), Some(200_000));
    }

    #[test]
    fn test_end_without_duration() {
        let list = ChapterList::new();
        list.add_chapter("Only", 5_000);
        assert_eq!(list.get_chapters()[0].end, 5_000);
    }

    #[test]
    fn test_negative_start_is_clamped() {
        let list = scenario();
        let chapter = list.add_chapter("x", -500);
        assert_eq!(chapter.start, 0);
        assert_eq!(
            chapter.error,
            Some(ChapterFault::OutOfRange {
                requested_ms: -500,
                clamped_ms: 0
            })
        );
    }

    #[test]
    fn test_start_past_duration_is_clamped() {
        let list = scenario();
        let chapter = list.add_chapter("Too late", 250_000);
        assert_eq!(chapter.start, 200_000);
        assert_eq!(chapter.end, 200_000);
        assert!(!chapter.is_valid());
    }

    #[test]
    fn test_duplicate_start_flags_later_insertion() {
        let list = scenario();
        let dup = list.add_chapter("Again", 90_000);
        let chapters = list.get_chapters();
        assert_eq!(chapters[1].title, "Chapter 2");
        assert!(chapters[1].is_valid());
        assert_eq!(chapters[2].id, dup.id);
        assert_eq!(
            chapters[2].error,
            Some(ChapterFault::DuplicateStart { start_ms: 90_000 })
        );
        assert_eq!(chapters[1].end, 200_000);
    }

    #[test]
    fn test_empty_title_is_flagged() {
        let list = scenario();
        let blank = list.add_chapter("   ", 30_000);
        assert_eq!(blank.error, Some(ChapterFault::EmptyTitle));
        assert_eq!(blank.title, "");
    }

    #[test]
    fn test_update_notifies_once() {
        let list = scenario();
        let seen = notifications(&list);
        let intro = list.get_chapters()[0].id;

        list.update_chapter(intro, ChapterPatch::title("Welcome").with_start(1_000));
        assert_eq!(seen.borrow().len(), 1);

        list.update_chapter(intro, ChapterPatch::title("Welcome"));
        list.update_chapter(intro, ChapterPatch::default());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_unknown_ids_are_ignored() {
        let list = scenario();
        let seen = notifications(&list);
        let gone = list.add_chapter("Temporary", 10_000).id;
        assert!(list.remove_chapter(gone));

        assert!(!list.remove_chapter(gone));
        assert_eq!(list.update_chapter(gone, ChapterPatch::title("x")), None);
        assert_eq!(*seen.borrow(), vec![3, 2]);
    }

    #[test]
    fn test_replace_from_text_bogus_line() {
        let list = ChapterList::new();
        list.replace_from_text("bogus line\n00:02:00 Real");

        let chapters = list.get_chapters();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].start, 0);
        assert_eq!(
            chapters[0].error,
            Some(ChapterFault::Unparseable {
                line: "bogus line".to_string()
            })
        );
        assert_eq!(chapters[1].start, 120_000);
        assert_eq!(chapters[1].title, "Real");
        assert!(chapters[1].is_valid());
        assert_eq!(list.export_as_list(), "bogus line\n00:02:00 Real");
    }

    #[test]
    fn test_unparseable_line_inherits_previous_start() {
        let list = ChapterList::new();
        list.replace_from_text("00:01:00 One\noops\n00:02:00 Two");
        let chapters = list.get_chapters();
        assert_eq!(chapters[1].start, 60_000);
        assert_eq!(chapters[1].title, "oops");
        assert_eq!(chapters[0].end, 120_000);
        assert!(chapters[0].is_valid());
    }

    #[test]
    fn test_replace_from_text_batches_notification() {
        let list = ChapterList::with_duration(600_000);
        let seen = notifications(&list);
        list.replace_from_text(
            "00:00:00 A\n00:01:00 B\n00:02:00 C\n00:03:00 D\n00:04:00 E",
        );
        assert_eq!(*seen.borrow(), vec![5]);
    }

    #[test]
    fn test_round_trip_keeps_ids() {
        let list = scenario();
        list.add_chapter("Outro", 150_000);
        let before = list.get_chapters();

        list.replace_from_text(&list.export_as_list());
        let after = list.get_chapters();
        assert_eq!(before, after);
    }

    #[test]
    fn test_inserted_line_keeps_ids_below() {
        let list = scenario();
        let before = list.get_chapters();
        list.replace_from_text("00:00:00 Intro\n00:00:30 Cold open\n00:01:30 Chapter 2");

        let after = list.get_chapters();
        assert_eq!(after.len(), 3);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[2].id, before[1].id);
        assert!(after[1].id != before[0].id && after[1].id != before[1].id);
    }

    #[test]
    fn test_deleted_line_keeps_ids_below() {
        let list = scenario();
        let outro = list.add_chapter("Outro", 150_000);
        list.replace_from_text("00:00:00 Intro\n00:02:30 Outro");
        assert_eq!(list.get_chapters()[1].id, outro.id);
    }

    #[test]
    fn test_retimed_line_gets_new_id() {
        let list = scenario();
        let old = list.get_chapters()[1].id;
        list.replace_from_text("00:00:00 Intro\n00:01:31 Chapter 2");
        assert!(list.get_chapters()[1].id != old);
    }

    #[test]
    fn test_unsorted_text_is_sorted() {
        let list = ChapterList::new();
        list.replace_from_text("00:02:00 Second\n00:01:00 First");
        assert_eq!(
            pairs(&list),
            vec![(60_000, "First".to_string()), (120_000, "Second".to_string())]
        );
    }

    #[test]
    fn test_uses_ms() {
        let list = scenario();
        assert!(!list.uses_ms());
        list.add_chapter("Precise", 100_250);
        assert!(list.uses_ms());
        assert_eq!(
            list.export_as_list(),
            "00:00:00.000 Intro\n00:01:30.000 Chapter 2\n00:01:40.250 Precise"
        );
    }

    #[test]
    fn test_set_duration_clamps_and_notifies() {
        let list = scenario();
        let seen = notifications(&list);
        assert!(list.set_duration(60_000));
        assert!(!list.set_duration(60_000));

        let chapters = list.get_chapters();
        assert_eq!(chapters[1].start, 60_000);
        assert!(matches!(chapters[1].error, Some(ChapterFault::OutOfRange { .. })));
        assert_eq!(chapters[0].end, 60_000);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_duration_shrink_then_grow_restores_starts() {
        let list = scenario();
        list.set_duration(60_000);
        list.set_duration(200_000);

        let chapters = list.get_chapters();
        assert_eq!(chapters[1].start, 90_000);
        assert!(chapters[1].is_valid());
        assert_eq!(list.export_as_list(), "00:00:00 Intro\n00:01:30 Chapter 2");
    }

    #[test]
    fn test_zero_duration_is_not_permanent() {
        let list = scenario();
        list.set_duration(0);
        assert_eq!(
            list.get_chapters()[1].error,
            Some(ChapterFault::OutOfRange {
                requested_ms: 90_000,
                clamped_ms: 0
            })
        );

        list.set_duration(200_000);
        assert_eq!(pairs(&list)[1], (90_000, "Chapter 2".to_string()));
        assert!(list.get_chapters().iter().all(Chapter::is_valid));
    }

    #[test]
    fn test_multiline_title_stays_on_one_line() {
        let list = scenario();
        let added = list.add_chapter("Two\nlines\r\n", 120_000);
        assert_eq!(added.title, "Two lines");

        list.update_chapter(added.id, ChapterPatch::title("Still\ntwo"));
        list.replace_all([(0, "Intro"), (60_000, "A\nB")]);
        let before = list.get_chapters();
        list.replace_from_text(&list.export_as_list());

        assert_eq!(list.get_chapters(), before);
        assert_eq!(list.export_as_list(), "00:00:00 Intro\n00:01:00 A B");
    }

    #[test]
    fn test_flagged_chapter_does_not_claim_start() {
        let list = scenario();
        let blank = list.add_chapter("", 30_000);
        let real = list.add_chapter("Cold open", 30_000);

        assert_eq!(list.chapter(blank.id).and_then(|c| c.error), Some(ChapterFault::EmptyTitle));
        assert_eq!(list.chapter(real.id).and_then(|c| c.error), None);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let list = scenario();
        let snapshot = list.get_chapters();
        list.add_chapter("Later", 120_000);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_listener_write_back_is_queued() {
        let list = Rc::new(scenario());
        let depth = Rc::new(Cell::new(0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let weak = Rc::downgrade(&list);
            let depth = depth.clone();
            let seen = seen.clone();
            list.subscribe(move |chapters: &[Chapter]| {
                depth.set(depth.get() + 1);
                assert_eq!(depth.get(), 1);
                seen.borrow_mut().push(chapters.len());
                // keep an outro at the end of every edit
                if chapters.iter().all(|c| c.title != "Outro") {
                    if let Some(list) = weak.upgrade() {
                        list.add_chapter("Outro", 190_000);
                    }
                }
                depth.set(depth.get() - 1);
            });
        }

        list.add_chapter("Chapter 3", 120_000);
        assert_eq!(*seen.borrow(), vec![3, 4]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_replace_all_mints_new_ids() {
        let list = scenario();
        let old: Vec<ChapterId> = list.get_chapters().iter().map(|c| c.id).collect();
        list.replace_all([(0, "Intro"), (90_000, "Chapter 2")]);
        let chapters = list.get_chapters();
        assert!(chapters.iter().all(|c| !old.contains(&c.id)));
        assert_eq!(list.export_as_list(), "00:00:00 Intro\n00:01:30 Chapter 2");
    }

    #[test]
    fn test_update_fixes_unparseable_chapter() {
        let list = ChapterList::new();
        list.replace_from_text("00:00:00 Intro\nmystery");
        let broken = list.get_chapters()[1].clone();
        let fixed = list
            .update_chapter(broken.id, ChapterPatch::start(30_000).with_title("Found it"))
            .expect("chapter exists");
        assert!(fixed.is_valid());
        assert_eq!(list.export_as_list(), "00:00:00 Intro\n00:00:30 Found it");
    }
}
