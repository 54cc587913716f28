//! Remote participants' cursors and selections for one document.
//!
//! Cursors live beside the delta log, not in it: they are never replayed or
//! rolled back. Updates from the local participant are ignored since the
//! host renders its own cursor.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::trace;

use crate::buffer::{Point, TextRange};
use crate::model::ParticipantId;
use crate::record::CursorRecord;

/// One remote participant's cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteCursor {
    pub participant: ParticipantId,
    pub position: Option<Point>,
    pub selection: Option<TextRange>,
}

/// Change notifications queued by [`RemoteCursorSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum CursorEvent {
    CursorAdded { participant: ParticipantId },
    PositionChanged { participant: ParticipantId, position: Point },
    SelectionChanged { participant: ParticipantId, range: TextRange },
    CursorRemoved { participant: ParticipantId },
}

#[derive(Debug, Clone, Default)]
pub struct RemoteCursorSet {
    local: Option<ParticipantId>,
    cursors: IndexMap<ParticipantId, RemoteCursor>,
    events: VecDeque<CursorEvent>,
}

impl RemoteCursorSet {
    #[must_use]
    pub fn new(local: Option<ParticipantId>) -> Self {
        Self {
            local,
            ..Self::default()
        }
    }

    pub fn set_local(&mut self, local: Option<ParticipantId>) {
        self.local = local;
    }

    fn is_local(&self, participant: &ParticipantId) -> bool {
        self.local.as_ref() == Some(participant)
    }

    fn entry(&mut self, participant: &ParticipantId) -> &mut RemoteCursor {
        if !self.cursors.contains_key(participant) {
            self.events.push_back(CursorEvent::CursorAdded {
                participant: participant.clone(),
            });
        }
        self.cursors
            .entry(participant.clone())
            .or_insert_with(|| RemoteCursor {
                participant: participant.clone(),
                position: None,
                selection: None,
            })
    }

    /// Move a participant's cursor. Returns `false` for the local participant.
    pub fn update_cursor(&mut self, participant: &ParticipantId, position: Point) -> bool {
        if self.is_local(participant) {
            trace!(%participant, "ignoring local cursor update");
            return false;
        }
        self.entry(participant).position = Some(position);
        self.events.push_back(CursorEvent::PositionChanged {
            participant: participant.clone(),
            position,
        });
        true
    }

    /// Set a participant's selection. Returns `false` for the local
    /// participant.
    pub fn update_selection(&mut self, participant: &ParticipantId, range: TextRange) -> bool {
        if self.is_local(participant) {
            trace!(%participant, "ignoring local selection update");
            return false;
        }
        self.entry(participant).selection = Some(range);
        self.events.push_back(CursorEvent::SelectionChanged {
            participant: participant.clone(),
            range,
        });
        true
    }

    pub fn remove_cursor(&mut self, participant: &ParticipantId) -> bool {
        if self.cursors.shift_remove(participant).is_none() {
            return false;
        }
        self.events.push_back(CursorEvent::CursorRemoved {
            participant: participant.clone(),
        });
        true
    }

    pub fn apply(&mut self, record: &CursorRecord) -> bool {
        match record {
            CursorRecord::Cursor { uid, position, .. } => self.update_cursor(uid, *position),
            CursorRecord::Selection { uid, range, .. } => self.update_selection(uid, *range),
            CursorRecord::Remove { uid, .. } => self.remove_cursor(uid),
        }
    }

    pub fn cursors(&self) -> impl Iterator<Item = &RemoteCursor> {
        self.cursors.values()
    }

    #[must_use]
    pub fn get(&self, participant: &ParticipantId) -> Option<&RemoteCursor> {
        self.cursors.get(participant)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<CursorEvent> {
        self.events.drain(..).collect()
    }
}
