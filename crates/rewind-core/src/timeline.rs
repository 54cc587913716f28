//! Per-document delta log with a movable replay pointer.
//!
//! The log is kept sorted by timestamp (ties in arrival order). The live
//! buffer always reflects exactly the first `applied` deltas, applied in
//! order. Moving between states is done by a single primitive, rolling the
//! pointer forward (`do`) or back (`undo`) one delta at a time:
//!
//! | Delta | `do` | `undo` |
//! |---|---|---|
//! | `open` | set title, grammar, text; mark open | restore the state and text it replaced |
//! | `edit` | replace each change's old text with new text | put back the displaced text, last change first |
//! | `title` | set new title | restore old title |
//! | `grammar` | set new grammar | restore old grammar |
//! | `modified` | set new flag | restore old flag |
//! | `destroy` | mark closed | mark open |
//!
//! Inserting a delta earlier than the pointer first rolls back to the
//! insertion point, so no later delta is ever applied underneath an earlier
//! one.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

use crate::anchor::{AnchorCache, ChangeKey, Direction};
use crate::buffer::{HighlightId, ScratchBuffer, TextBuffer, TextRange};
use crate::cursor::RemoteCursorSet;
use crate::delta::{Delta, DeltaPayload};
use crate::error::ErrorCode;
use crate::model::{DeltaId, DocumentId, ParticipantId, Timestamp, ViewingTimestamp};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// How [`DocumentTimeline::insert`] treats the new delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Apply the delta through the replay primitive.
    #[default]
    Apply,
    /// The buffer already reflects the delta (historical hydration, or a
    /// local edit the host made itself). The pointer moves past it without
    /// invoking `do`.
    ///
    /// Only honoured while viewing the latest state with the pointer at the
    /// insertion point. Otherwise the buffer cannot hold the delta in order,
    /// so it is treated as [`InsertMode::Apply`] and a warning is logged.
    AlreadyApplied,
}

/// Materialized document metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DocumentState {
    pub title: String,
    pub grammar: Option<String>,
    pub open: bool,
    pub modified: bool,
}

/// Counters of replay steps, for observing idempotence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReplayStats {
    pub done: u64,
    pub undone: u64,
}

/// A delta together with the id the timeline assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub id: DeltaId,
    #[serde(flatten)]
    pub delta: Delta,
}

// ---------------------------------------------------------------------------
// DocumentTimeline
// ---------------------------------------------------------------------------

pub struct DocumentTimeline {
    id: DocumentId,
    entries: Vec<Entry>,
    /// Number of entries currently applied; the replay pointer is
    /// `applied - 1`.
    applied: usize,
    viewing: ViewingTimestamp,
    state: DocumentState,
    buffer: Box<dyn TextBuffer>,
    anchors: AnchorCache,
    cursors: RemoteCursorSet,
    stats: ReplayStats,
    /// State and text each applied `open` replaced, for its undo.
    displaced: HashMap<DeltaId, (DocumentState, String)>,
    next_delta: u64,
}

impl fmt::Debug for DocumentTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentTimeline")
            .field("id", &self.id)
            .field("deltas", &self.entries.len())
            .field("applied", &self.applied)
            .field("viewing", &self.viewing)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DocumentTimeline {
    #[must_use]
    pub fn new(id: DocumentId, buffer: Box<dyn TextBuffer>) -> Self {
        Self {
            id,
            entries: Vec::new(),
            applied: 0,
            viewing: ViewingTimestamp::Latest,
            state: DocumentState::default(),
            buffer,
            anchors: AnchorCache::new(),
            cursors: RemoteCursorSet::default(),
            stats: ReplayStats::default(),
            displaced: HashMap::new(),
            next_delta: 0,
        }
    }

    /// Seed the live state without recording deltas. Used before hydrating
    /// history with [`InsertMode::AlreadyApplied`].
    pub fn seed(&mut self, state: DocumentState, contents: &str) {
        self.buffer.set_text(contents);
        self.buffer.set_grammar(state.grammar.as_deref());
        self.state = state;
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert a delta in timestamp order and bring the buffer back to the
    /// current viewing timestamp.
    pub fn insert(&mut self, delta: Delta, mode: InsertMode) -> DeltaId {
        let id = DeltaId(self.next_delta);
        self.next_delta += 1;

        let pos = self
            .entries
            .partition_point(|e| e.delta.timestamp <= delta.timestamp);
        let pre_applied = mode == InsertMode::AlreadyApplied;
        let in_place = pre_applied && self.applied == pos && self.viewing.is_latest();
        if pre_applied && !in_place {
            warn!(
                code = %ErrorCode::PreappliedOutOfPlace,
                document = %self.id,
                delta = %id,
                pos,
                applied = self.applied,
                "pre-applied delta is not at the replay pointer, applying it instead"
            );
        }
        if self.applied > pos {
            debug!(document = %self.id, delta = %id, pos, applied = self.applied, "rolling back for out-of-order insert");
            self.roll_to(pos);
        }

        trace!(document = %self.id, delta = %id, kind = %delta.kind(), pos, "insert");
        self.entries.insert(pos, Entry { id, delta });

        if in_place {
            self.applied = pos + 1;
        }

        self.roll_to(self.target_index());
        id
    }

    /// Move to `viewing` and toggle read-only on the buffer.
    pub fn set_viewing_timestamp(&mut self, viewing: ViewingTimestamp) {
        self.viewing = viewing;
        self.buffer.set_read_only(!viewing.is_latest());
        self.roll_to(self.target_index());
    }

    /// Number of deltas that should be applied for the current viewing
    /// timestamp.
    fn target_index(&self) -> usize {
        match self.viewing {
            ViewingTimestamp::Latest => self.entries.len(),
            ViewingTimestamp::At(t) => self.entries.partition_point(|e| e.delta.timestamp <= t),
        }
    }

    fn roll_to(&mut self, target: usize) {
        let target = target.min(self.entries.len());
        let Self {
            id,
            entries,
            applied,
            state,
            buffer,
            anchors,
            stats,
            displaced,
            ..
        } = self;
        let mut replay = Replay {
            document: id,
            state,
            buffer: &mut **buffer,
            anchors,
            stats,
            displaced,
        };
        while *applied < target {
            replay.step(&entries[*applied], Direction::Do);
            *applied += 1;
        }
        while *applied > target {
            *applied -= 1;
            replay.step(&entries[*applied], Direction::Undo);
        }
    }

    // -----------------------------------------------------------------------
    // Historical reads
    // -----------------------------------------------------------------------

    /// Content after applying deltas `0..=index` (`None` = nothing applied)
    /// to a throwaway buffer. The live buffer is untouched.
    #[must_use]
    pub fn materialize_at(&self, index: Option<usize>) -> String {
        self.scratch_at(index).text()
    }

    /// [`DocumentTimeline::materialize_at`], split into lines.
    #[must_use]
    pub fn materialize_lines_at(&self, index: Option<usize>) -> Vec<String> {
        self.scratch_at(index).lines()
    }

    fn scratch_at(&self, index: Option<usize>) -> ScratchBuffer {
        let mut scratch = ScratchBuffer::new();
        let Some(index) = index else {
            return scratch;
        };
        for entry in self.entries.iter().take(index + 1) {
            match &entry.delta.payload {
                DeltaPayload::Open(open) => scratch.set_text(&open.contents),
                DeltaPayload::Edit(edit) => {
                    for change in &edit.changes {
                        scratch.replace_text(change.old_range, &change.new_text);
                    }
                }
                DeltaPayload::Title(_)
                | DeltaPayload::Grammar(_)
                | DeltaPayload::Modified(_)
                | DeltaPayload::Destroy(_) => {}
            }
        }
        scratch
    }

    #[must_use]
    pub fn position_of(&self, delta: DeltaId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == delta)
    }

    /// Content just before `delta` was applied.
    #[must_use]
    pub fn text_before_delta(&self, delta: DeltaId) -> Option<String> {
        let pos = self.position_of(delta)?;
        Some(self.materialize_at(pos.checked_sub(1)))
    }

    /// Content just after `delta` was applied.
    #[must_use]
    pub fn text_after_delta(&self, delta: DeltaId) -> Option<String> {
        let pos = self.position_of(delta)?;
        Some(self.materialize_at(Some(pos)))
    }

    #[must_use]
    pub fn has_delta_after(&self, t: Timestamp) -> bool {
        self.entries.last().is_some_and(|e| e.delta.timestamp > t)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Index of the last applied delta, `None` when nothing is applied.
    #[must_use]
    pub const fn replay_pointer(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    #[must_use]
    pub const fn viewing_timestamp(&self) -> ViewingTimestamp {
        self.viewing
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn delta(&self, id: DeltaId) -> Option<&Delta> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.delta)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn state(&self) -> &DocumentState {
        &self.state
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.state.title
    }

    #[must_use]
    pub fn grammar(&self) -> Option<&str> {
        self.state.grammar.as_deref()
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.state.open
    }

    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.state.modified
    }

    /// Live buffer content at the current viewing timestamp.
    #[must_use]
    pub fn text(&self) -> String {
        self.buffer.text()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.buffer.lines()
    }

    #[must_use]
    pub fn buffer(&self) -> &dyn TextBuffer {
        self.buffer.as_ref()
    }

    /// Replay counters, including anchors that degraded to empty ranges.
    #[must_use]
    pub const fn stats(&self) -> ReplayStats {
        self.stats
    }

    #[must_use]
    pub const fn degraded_anchors(&self) -> u64 {
        self.anchors.degraded()
    }

    #[must_use]
    pub const fn cursors(&self) -> &RemoteCursorSet {
        &self.cursors
    }

    pub const fn cursors_mut(&mut self) -> &mut RemoteCursorSet {
        &mut self.cursors
    }

    pub fn set_local_participant(&mut self, local: Option<ParticipantId>) {
        self.cursors.set_local(local);
    }

    pub fn add_highlight(&mut self, range: TextRange) -> HighlightId {
        self.buffer.add_highlight(range)
    }

    pub fn remove_highlight(&mut self, id: HighlightId) -> bool {
        self.buffer.remove_highlight(id)
    }

    pub fn focus(&mut self, range: TextRange) -> bool {
        self.buffer.focus(range)
    }
}

// ---------------------------------------------------------------------------
// Replay primitive
// ---------------------------------------------------------------------------

/// Split borrow of the timeline fields touched by a single replay step.
struct Replay<'a> {
    document: &'a DocumentId,
    state: &'a mut DocumentState,
    buffer: &'a mut dyn TextBuffer,
    anchors: &'a mut AnchorCache,
    stats: &'a mut ReplayStats,
    displaced: &'a mut HashMap<DeltaId, (DocumentState, String)>,
}

impl Replay<'_> {
    fn step(&mut self, entry: &Entry, direction: Direction) {
        trace!(document = %self.document, delta = %entry.id, kind = %entry.delta.kind(), ?direction, "replay");
        match direction {
            Direction::Do => self.stats.done += 1,
            Direction::Undo => self.stats.undone += 1,
        }

        match (&entry.delta.payload, direction) {
            (DeltaPayload::Open(open), Direction::Do) => {
                self.displaced
                    .insert(entry.id, (self.state.clone(), self.buffer.text()));
                open.title.clone_into(&mut self.state.title);
                self.state.grammar = Some(open.grammar.clone());
                self.state.open = true;
                self.buffer.set_grammar(Some(&open.grammar));
                self.buffer.set_text(&open.contents);
            }
            (DeltaPayload::Open(_), Direction::Undo) => {
                let (state, text) = self.displaced.remove(&entry.id).unwrap_or_default();
                self.buffer.set_grammar(state.grammar.as_deref());
                self.buffer.set_text(&text);
                *self.state = state;
            }
            (DeltaPayload::Edit(edit), Direction::Do) => {
                for (index, change) in edit.changes.iter().enumerate() {
                    let key = ChangeKey {
                        delta: entry.id,
                        index,
                    };
                    let range = self.anchors.locate(key, change, direction, &*self.buffer);
                    let rep = self.buffer.replace_text(range, &change.new_text);
                    self.anchors.record(key, direction, rep, &mut *self.buffer);
                }
            }
            (DeltaPayload::Edit(edit), Direction::Undo) => {
                for (index, change) in edit.changes.iter().enumerate().rev() {
                    let key = ChangeKey {
                        delta: entry.id,
                        index,
                    };
                    let range = self.anchors.locate(key, change, direction, &*self.buffer);
                    let text = self.anchors.restore_text(key, change).to_owned();
                    let rep = self.buffer.replace_text(range, &text);
                    self.anchors.record(key, direction, rep, &mut *self.buffer);
                }
            }
            (DeltaPayload::Title(title), Direction::Do) => {
                title.new_title.clone_into(&mut self.state.title);
            }
            (DeltaPayload::Title(title), Direction::Undo) => {
                title.old_title.clone_into(&mut self.state.title);
            }
            (DeltaPayload::Grammar(grammar), Direction::Do) => {
                self.state.grammar = Some(grammar.new_grammar.clone());
                self.buffer.set_grammar(Some(&grammar.new_grammar));
            }
            (DeltaPayload::Grammar(grammar), Direction::Undo) => {
                self.state.grammar = Some(grammar.old_grammar.clone());
                self.buffer.set_grammar(Some(&grammar.old_grammar));
            }
            (DeltaPayload::Modified(modified), Direction::Do) => {
                self.state.modified = modified.new_flag;
            }
            (DeltaPayload::Modified(modified), Direction::Undo) => {
                self.state.modified = modified.old_flag;
            }
            (DeltaPayload::Destroy(_), Direction::Do) => self.state.open = false,
            (DeltaPayload::Destroy(_), Direction::Undo) => self.state.open = true,
        }
    }
}
