//! Text-buffer adapter seam and the in-memory [`ScratchBuffer`].
//!
//! The engines never touch an editor widget directly. Every document is
//! paired with a [`TextBuffer`] supplied by the host (through a
//! [`BufferFactory`]); replay drives it with `set_text`/`replace_text` and
//! asks it for anchors that survive later edits.
//!
//! # Anchor gravity in `ScratchBuffer`
//!
//! When a range `old` is replaced and the inserted text ends at `new_end`:
//!
//! - an anchor **start** left of or at `old.start` stays put, one inside
//!   `old` collapses to `old.start`, one at or after `old.end` shifts;
//! - an anchor **end** after `old.end` shifts, one inside `old` moves to
//!   `new_end`, one exactly at `old.end` shifts when `old` is non-empty or
//!   the anchor itself is empty at that point.
//!
//! The net effect is that an anchor whose range is exactly the replaced range
//! ends up covering the replacement text, which is what do/undo replay of a
//! single change needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::DocumentId;

/// A zero-based `(row, column)` position. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Position reached after writing `text` starting at `self`.
    #[must_use]
    pub fn advance(self, text: &str) -> Self {
        let newlines = text.matches('\n').count();
        if newlines == 0 {
            return Self::new(self.row, self.column + char_count(text));
        }
        let tail = text.rsplit('\n').next().unwrap_or_default();
        Self::new(self.row + to_u32(newlines), char_count(tail))
    }

    fn shifted(self, old_end: Self, new_end: Self) -> Self {
        if self.row == old_end.row {
            Self::new(new_end.row, new_end.column + (self.column - old_end.column))
        } else {
            Self::new(self.row - old_end.row + new_end.row, self.column)
        }
    }
}

impl From<(u32, u32)> for Point {
    fn from((row, column): (u32, u32)) -> Self {
        Self::new(row, column)
    }
}

impl From<Point> for (u32, u32) {
    fn from(point: Point) -> Self {
        (point.row, point.column)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A half-open text range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: Point,
    pub end: Point,
}

impl TextRange {
    /// Build a range, swapping the endpoints if they are reversed.
    #[must_use]
    pub fn new(start: Point, end: Point) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    #[must_use]
    pub const fn empty(at: Point) -> Self {
        Self { start: at, end: at }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Map this range through the replacement of `old` by text ending at
    /// `new_end`. See the module docs for the gravity rules.
    #[must_use]
    pub fn rebase(self, old: Self, new_end: Point) -> Self {
        let start = if self.start <= old.start {
            self.start
        } else if self.start >= old.end {
            self.start.shifted(old.end, new_end)
        } else {
            old.start
        };

        let end = if self.end > old.end
            || (self.end == old.end && (!old.is_empty() || self.is_empty()))
        {
            self.end.shifted(old.end, new_end)
        } else if self.end <= old.start {
            self.end
        } else {
            new_end
        };

        Self::new(start, end)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Opaque handle to a position reference held by a [`TextBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorRef(pub u64);

/// Opaque handle to a highlight decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HighlightId(pub u64);

/// Outcome of [`TextBuffer::replace_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The text that occupied the range before the replacement.
    pub old_text: String,
    /// The range now covered by the inserted text.
    pub new_range: TextRange,
}

/// The per-document text buffer the engines replay into.
pub trait TextBuffer {
    /// Replace the whole content. Existing anchors and highlights are dropped.
    fn set_text(&mut self, content: &str);

    fn text(&self) -> String;

    fn lines(&self) -> Vec<String> {
        self.text().split('\n').map(ToOwned::to_owned).collect()
    }

    /// Text covered by `range`, or `None` if either endpoint lies outside
    /// the document.
    fn text_in_range(&self, range: TextRange) -> Option<String>;

    /// Nearest valid position to `point`.
    fn clip_point(&self, point: Point) -> Point;

    fn replace_text(&mut self, range: TextRange, text: &str) -> Replacement;

    /// Place an anchor tracking `range` through later edits.
    fn anchor(&mut self, range: TextRange) -> AnchorRef;

    /// Current range of an anchor, or `None` if the buffer no longer knows it.
    fn resolve_anchor(&self, anchor: AnchorRef) -> Option<TextRange>;

    /// `None` clears the grammar.
    fn set_grammar(&mut self, grammar: Option<&str>);

    fn set_read_only(&mut self, read_only: bool);

    fn add_highlight(&mut self, range: TextRange) -> HighlightId;

    fn remove_highlight(&mut self, id: HighlightId) -> bool;

    fn focus(&mut self, range: TextRange) -> bool;
}

/// Creates the adapter paired with each newly registered document.
pub trait BufferFactory {
    fn create(&mut self, document: &DocumentId) -> Box<dyn TextBuffer>;
}

impl<F> BufferFactory for F
where
    F: FnMut(&DocumentId) -> Box<dyn TextBuffer>,
{
    fn create(&mut self, document: &DocumentId) -> Box<dyn TextBuffer> {
        self(document)
    }
}

/// Factory producing a fresh [`ScratchBuffer`] per document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScratchBufferFactory;

impl BufferFactory for ScratchBufferFactory {
    fn create(&mut self, _document: &DocumentId) -> Box<dyn TextBuffer> {
        Box::new(ScratchBuffer::new())
    }
}

// ---------------------------------------------------------------------------
// ScratchBuffer
// ---------------------------------------------------------------------------

/// A plain in-memory [`TextBuffer`].
///
/// Used as the throwaway buffer for historical materialization and as the
/// default adapter when no editor is attached. Read-only state is recorded
/// but does not block replay writes.
#[derive(Debug, Clone, Default)]
pub struct ScratchBuffer {
    text: String,
    grammar: Option<String>,
    read_only: bool,
    anchors: BTreeMap<u64, TextRange>,
    highlights: BTreeMap<u64, TextRange>,
    focused: Option<TextRange>,
    next_handle: u64,
}

impl ScratchBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text(text: &str) -> Self {
        let mut buffer = Self::new();
        buffer.set_text(text);
        buffer
    }

    #[must_use]
    pub fn grammar(&self) -> Option<&str> {
        self.grammar.as_deref()
    }

    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub const fn focused(&self) -> Option<TextRange> {
        self.focused
    }

    pub fn highlights(&self) -> impl Iterator<Item = (HighlightId, TextRange)> + '_ {
        self.highlights.iter().map(|(id, range)| (HighlightId(*id), *range))
    }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn line_count(&self) -> u32 {
        to_u32(self.text.matches('\n').count() + 1)
    }

    fn line(&self, row: u32) -> Option<&str> {
        self.text.split('\n').nth(row as usize)
    }

    /// Byte offset of an in-bounds point.
    fn offset_of(&self, point: Point) -> Option<usize> {
        let mut offset = 0;
        for (row, line) in self.text.split('\n').enumerate() {
            if row == point.row as usize {
                let column = point.column as usize;
                if column == char_count(line) as usize {
                    return Some(offset + line.len());
                }
                return line
                    .char_indices()
                    .nth(column)
                    .map(|(byte, _)| offset + byte);
            }
            offset += line.len() + 1;
        }
        None
    }
}

impl TextBuffer for ScratchBuffer {
    fn set_text(&mut self, content: &str) {
        content.clone_into(&mut self.text);
        self.anchors.clear();
        self.highlights.clear();
        self.focused = None;
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn text_in_range(&self, range: TextRange) -> Option<String> {
        let start = self.offset_of(range.start)?;
        let end = self.offset_of(range.end)?;
        self.text.get(start..end).map(ToOwned::to_owned)
    }

    fn clip_point(&self, point: Point) -> Point {
        let last_row = self.line_count() - 1;
        if point.row > last_row {
            let len = self.line(last_row).map_or(0, char_count);
            return Point::new(last_row, len);
        }
        let len = self.line(point.row).map_or(0, char_count);
        Point::new(point.row, point.column.min(len))
    }

    fn replace_text(&mut self, range: TextRange, text: &str) -> Replacement {
        let old = TextRange::new(self.clip_point(range.start), self.clip_point(range.end));
        let start = self.offset_of(old.start).unwrap_or(self.text.len());
        let end = self.offset_of(old.end).unwrap_or(self.text.len());
        let old_text = self.text[start..end].to_owned();
        self.text.replace_range(start..end, text);

        let new_end = old.start.advance(text);
        for anchor in self.anchors.values_mut() {
            *anchor = anchor.rebase(old, new_end);
        }
        for highlight in self.highlights.values_mut() {
            *highlight = highlight.rebase(old, new_end);
        }

        Replacement {
            old_text,
            new_range: TextRange::new(old.start, new_end),
        }
    }

    fn anchor(&mut self, range: TextRange) -> AnchorRef {
        let handle = self.next_handle();
        self.anchors.insert(handle, range);
        AnchorRef(handle)
    }

    fn resolve_anchor(&self, anchor: AnchorRef) -> Option<TextRange> {
        self.anchors.get(&anchor.0).copied()
    }

    fn set_grammar(&mut self, grammar: Option<&str>) {
        self.grammar = grammar.map(ToOwned::to_owned);
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn add_highlight(&mut self, range: TextRange) -> HighlightId {
        let handle = self.next_handle();
        self.highlights.insert(handle, range);
        HighlightId(handle)
    }

    fn remove_highlight(&mut self, id: HighlightId) -> bool {
        self.highlights.remove(&id.0).is_some()
    }

    fn focus(&mut self, range: TextRange) -> bool {
        self.focused = Some(range);
        true
    }
}

fn char_count(s: &str) -> u32 {
    to_u32(s.chars().count())
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
