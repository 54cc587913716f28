//! Session participants and the lookup seam used to resolve them.
//!
//! Roster management belongs to the host application. The engines only need
//! to turn a [`ParticipantId`] into a [`Participant`] when one is known, so
//! they depend on the [`ParticipantDirectory`] trait. [`Roster`] is a plain
//! in-memory implementation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ids::ParticipantId;
use super::time::Timestamp;

/// A single participant in a shared session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Whether this participant is the local user.
    #[serde(default)]
    pub is_me: bool,
    #[serde(default)]
    pub color_index: u32,
    #[serde(default)]
    pub joined: Option<Timestamp>,
    #[serde(default)]
    pub left: Option<Timestamp>,
}

impl Participant {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: name.into(),
            is_me: false,
            color_index: 0,
            joined: None,
            left: None,
        }
    }

    /// Mark this participant as the local user.
    #[must_use]
    pub const fn local(mut self) -> Self {
        self.is_me = true;
        self
    }
}

/// Participant lookup by id.
pub trait ParticipantDirectory {
    fn participant(&self, id: &ParticipantId) -> Option<&Participant>;

    /// Build a reference that keeps the raw id even when the lookup fails.
    fn reference(&self, id: &ParticipantId) -> ParticipantRef {
        ParticipantRef {
            id: id.clone(),
            participant: self.participant(id).cloned(),
        }
    }
}

/// A participant reference as recorded on an activity item.
///
/// `participant` is `None` when the id was not registered at the time the
/// item was recorded; consumers must handle that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: ParticipantId,
    pub participant: Option<Participant>,
}

impl ParticipantRef {
    #[must_use]
    pub const fn unresolved(id: ParticipantId) -> Self {
        Self {
            id,
            participant: None,
        }
    }

    #[must_use]
    pub fn is_me(&self) -> bool {
        self.participant.as_ref().is_some_and(|p| p.is_me)
    }

    /// Display name, falling back to the raw id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.participant
            .as_ref()
            .map_or(self.id.as_str(), |p| p.name.as_str())
    }
}

/// In-memory participant directory preserving registration order.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: IndexMap<ParticipantId, Participant>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a participant.
    pub fn insert(&mut self, participant: Participant) {
        self.participants.insert(participant.id.clone(), participant);
    }

    /// The local participant, if registered.
    #[must_use]
    pub fn me(&self) -> Option<&Participant> {
        self.participants.values().find(|p| p.is_me)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl ParticipantDirectory for Roster {
    fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }
}

impl FromIterator<Participant> for Roster {
    fn from_iter<I: IntoIterator<Item = Participant>>(iter: I) -> Self {
        let mut roster = Self::new();
        for participant in iter {
            roster.insert(participant);
        }
        roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_keeps_unknown_ids() {
        let roster: Roster = [Participant::new("u1", "Ada").local()].into_iter().collect();

        let known = roster.reference(&ParticipantId::new("u1"));
        assert!(known.is_me());
        assert_eq!(known.display_name(), "Ada");

        let unknown = roster.reference(&ParticipantId::new("ghost"));
        assert!(unknown.participant.is_none());
        assert!(!unknown.is_me());
        assert_eq!(unknown.display_name(), "ghost");
    }

    #[test]
    fn me_finds_local_participant() {
        let mut roster = Roster::new();
        roster.insert(Participant::new("u2", "Bo"));
        assert!(roster.me().is_none());
        roster.insert(Participant::new("u1", "Ada").local());
        assert_eq!(roster.me().map(|p| p.name.as_str()), Some("Ada"));
        assert_eq!(roster.len(), 2);
    }
}
