//! Anchor cache: stable positions for edit changes across replay.
//!
//! A change's recorded ranges are only valid against the document as it
//! was when the change was made. The first time a change is applied forward
//! the timeline binds a buffer anchor over the inserted text; before every
//! later `do`/`undo` of that change the anchor is resolved to find where the
//! text sits now.
//!
//! The cache is owned by the timeline and keyed by [`ChangeKey`]. Changes
//! themselves stay immutable.
//!
//! Resolution order for a bound change:
//!
//! 1. `do`: the recorded range, if the buffer holds the recorded old text
//!    there. `undo`: the last range the change was applied at, if it still
//!    holds the new text;
//! 2. the anchored range, under the same check;
//! 3. the last range, under the same check;
//! 4. the anchored range as-is;
//! 5. the last range, if it still lies inside the document;
//! 6. a zero-length range at the nearest valid position (degraded).
//!
//! Undo writes back the text the matching `do` actually replaced, which
//! differs from the recorded old text whenever the change first landed on a
//! buffer that did not hold it.

use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

use crate::buffer::{AnchorRef, Replacement, TextBuffer, TextRange};
use crate::delta::Change;
use crate::error::ErrorCode;
use crate::model::DeltaId;

/// Identity of one change inside one delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeKey {
    pub delta: DeltaId,
    pub index: usize,
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.delta, self.index)
    }
}

/// Replay direction of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Do,
    Undo,
}

#[derive(Debug, Clone)]
struct Binding {
    anchor: AnchorRef,
    last: TextRange,
    /// Text displaced by the most recent `do`.
    replaced: String,
}

#[derive(Debug, Default)]
pub struct AnchorCache {
    bindings: HashMap<ChangeKey, Binding>,
    degraded: u64,
}

impl AnchorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolutions that had to collapse to an empty range.
    #[must_use]
    pub const fn degraded(&self) -> u64 {
        self.degraded
    }

    /// Range that `change` must be replaced at for `direction`.
    pub fn locate(
        &mut self,
        key: ChangeKey,
        change: &Change,
        direction: Direction,
        buffer: &dyn TextBuffer,
    ) -> TextRange {
        let (recorded, expected) = match direction {
            Direction::Do => (change.old_range, change.old_text.as_str()),
            Direction::Undo => (change.new_range, change.new_text.as_str()),
        };

        let Some(binding) = self.bindings.get(&key) else {
            return recorded;
        };
        let (anchor, last) = (binding.anchor, binding.last);

        let holds = |range: TextRange| buffer.text_in_range(range).as_deref() == Some(expected);

        let preferred = match direction {
            Direction::Do => recorded,
            Direction::Undo => last,
        };
        if holds(preferred) {
            return preferred;
        }
        let anchored = buffer.resolve_anchor(anchor);
        if let Some(range) = anchored.filter(|r| holds(*r)) {
            debug!(change = %key, range = %range, "following anchor");
            return range;
        }
        if holds(last) {
            return last;
        }
        if let Some(range) = anchored {
            debug!(change = %key, range = %range, "anchored text differs, replaying in place");
            return range;
        }
        if buffer.text_in_range(last).is_some() {
            warn!(
                code = %ErrorCode::AnchorDegraded,
                change = %key,
                "anchor lost and text differs, replaying at last known range"
            );
            return last;
        }

        self.degraded += 1;
        let at = buffer.clip_point(last.start);
        warn!(
            code = %ErrorCode::AnchorDegraded,
            change = %key,
            at = %at,
            "anchor unresolvable, collapsing to empty range"
        );
        TextRange::empty(at)
    }

    /// Text an undo of `change` must write back: whatever its last `do`
    /// displaced, or the recorded old text if it was never applied here.
    #[must_use]
    pub fn restore_text<'a>(&'a self, key: ChangeKey, change: &'a Change) -> &'a str {
        self.bindings
            .get(&key)
            .map_or(change.old_text.as_str(), |b| b.replaced.as_str())
    }

    /// Record where a change now sits after being replayed. The first `do`
    /// for a key places the anchor; later steps only refine the fallback.
    pub fn record(
        &mut self,
        key: ChangeKey,
        direction: Direction,
        replacement: Replacement,
        buffer: &mut dyn TextBuffer,
    ) {
        let Replacement {
            old_text,
            new_range,
        } = replacement;
        if let Some(binding) = self.bindings.get_mut(&key) {
            binding.last = new_range;
            if direction == Direction::Do {
                binding.replaced = old_text;
            }
            return;
        }
        if direction == Direction::Undo {
            return;
        }
        let anchor = buffer.anchor(new_range);
        self.bindings.insert(
            key,
            Binding {
                anchor,
                last: new_range,
                replaced: old_text,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Point, ScratchBuffer};

    fn key(delta: u64) -> ChangeKey {
        ChangeKey {
            delta: DeltaId(delta),
            index: 0,
        }
    }

    fn replay(
        cache: &mut AnchorCache,
        buf: &mut ScratchBuffer,
        k: ChangeKey,
        change: &Change,
        direction: Direction,
    ) {
        let range = cache.locate(k, change, direction, buf);
        let text = match direction {
            Direction::Do => change.new_text.clone(),
            Direction::Undo => cache.restore_text(k, change).to_owned(),
        };
        let rep = buf.replace_text(range, &text);
        cache.record(k, direction, rep, buf);
    }

    #[test]
    fn unbound_change_uses_recorded_ranges() {
        let mut cache = AnchorCache::new();
        let buf = ScratchBuffer::with_text("abc");
        let change = Change::at(Point::new(0, 1), "b", "XY");
        assert_eq!(
            cache.locate(key(1), &change, Direction::Do, &buf),
            change.old_range
        );
        assert_eq!(
            cache.locate(key(1), &change, Direction::Undo, &buf),
            change.new_range
        );
    }

    #[test]
    fn anchor_follows_text_shifted_by_earlier_insert() {
        let mut cache = AnchorCache::new();
        let mut buf = ScratchBuffer::with_text("hello world");
        let change = Change::at(Point::new(0, 6), "world", "there");
        replay(&mut cache, &mut buf, key(1), &change, Direction::Do);
        assert_eq!(buf.text(), "hello there");

        // Text inserted in front without going through the cache.
        buf.replace_text(TextRange::empty(Point::new(0, 0)), ">> ");
        replay(&mut cache, &mut buf, key(1), &change, Direction::Undo);
        assert_eq!(buf.text(), ">> hello world");
        replay(&mut cache, &mut buf, key(1), &change, Direction::Do);
        assert_eq!(buf.text(), ">> hello there");
    }

    #[test]
    fn lost_anchor_falls_back_to_last_range() {
        let mut cache = AnchorCache::new();
        let mut buf = ScratchBuffer::with_text("abc");
        let change = Change::at(Point::new(0, 3), "", "d");
        replay(&mut cache, &mut buf, key(2), &change, Direction::Do);

        // Anchors are dropped on a full reset.
        buf.set_text("abcd");
        replay(&mut cache, &mut buf, key(2), &change, Direction::Undo);
        assert_eq!(buf.text(), "abc");
        assert_eq!(cache.degraded(), 0);
    }

    #[test]
    fn vanished_range_collapses() {
        let mut cache = AnchorCache::new();
        let mut buf = ScratchBuffer::with_text("line one\nline two");
        let change = Change::at(Point::new(1, 5), "two", "2");
        replay(&mut cache, &mut buf, key(3), &change, Direction::Do);

        buf.set_text("x");
        let range = cache.locate(key(3), &change, Direction::Undo, &buf);
        assert!(range.is_empty());
        assert_eq!(range.start, Point::new(0, 1));
        assert_eq!(cache.degraded(), 1);
    }

    #[test]
    fn undo_restores_the_text_do_displaced() {
        let mut cache = AnchorCache::new();
        let mut buf = ScratchBuffer::with_text("a\nb\nc");
        // Recorded against a buffer where row 2 held "b".
        let change = Change::at(Point::new(2, 0), "b", "B");
        replay(&mut cache, &mut buf, key(4), &change, Direction::Do);
        assert_eq!(buf.text(), "a\nb\nB");
        assert_eq!(cache.restore_text(key(4), &change), "c");

        replay(&mut cache, &mut buf, key(4), &change, Direction::Undo);
        assert_eq!(buf.text(), "a\nb\nc");
    }

    #[test]
    fn redo_prefers_recorded_range_when_it_matches() {
        let mut cache = AnchorCache::new();
        let mut buf = ScratchBuffer::with_text("a\nb\nc");
        let change = Change::at(Point::new(2, 0), "b", "B");
        replay(&mut cache, &mut buf, key(5), &change, Direction::Do);
        replay(&mut cache, &mut buf, key(5), &change, Direction::Undo);

        // An earlier line arrives and shifts "b" onto the recorded row.
        buf.replace_text(TextRange::empty(Point::new(0, 0)), "X\n");
        replay(&mut cache, &mut buf, key(5), &change, Direction::Do);
        assert_eq!(buf.text(), "X\na\nB\nc");
        assert_eq!(cache.restore_text(key(5), &change), "b");
    }
}
