//! Activity items: immutable timestamped facts from the message log.

use indexmap::IndexMap;
use serde::Serialize;

use super::reference::{FileReference, extract_references};
use crate::model::{DocumentId, ParticipantDirectory, ParticipantRef, Timestamp};
use crate::record::{EditRecord, FileContents, MessageRecord};
use crate::registry::TitleLookup;

/// Whether a presence event is a join or a leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Connect,
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMessage {
    pub sender: ParticipantRef,
    pub timestamp: Timestamp,
    pub body: String,
    pub references: Vec<FileReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceEvent {
    pub participant: ParticipantRef,
    pub timestamp: Timestamp,
    pub action: PresenceAction,
}

/// Who edited which documents between `start` and `end`, with the content
/// of each document before and after the span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSummary {
    pub authors: Vec<ParticipantRef>,
    pub documents: Vec<DocumentId>,
    pub start: Timestamp,
    pub end: Timestamp,
    pub contents: IndexMap<DocumentId, FileContents>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActivityItem {
    Text(TextMessage),
    Presence(PresenceEvent),
    Edit(EditSummary),
}

impl ActivityItem {
    /// Ordering timestamp. Edit summaries order by the end of their span.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        match self {
            Self::Text(m) => m.timestamp,
            Self::Presence(p) => p.timestamp,
            Self::Edit(e) => e.end,
        }
    }

    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Presence(_) => "presence",
            Self::Edit(_) => "edit",
        }
    }

    /// Convert a message record. Participant ids that the directory does
    /// not know are kept as unresolved references. Returns `None` for a
    /// retraction, which is not an item.
    #[must_use]
    pub fn from_record(
        record: &MessageRecord,
        participants: &dyn ParticipantDirectory,
        titles: &dyn TitleLookup,
    ) -> Option<Self> {
        let item = match record {
            MessageRecord::Text {
                uid,
                timestamp,
                message,
            } => Self::Text(TextMessage {
                sender: participants.reference(uid),
                timestamp: *timestamp,
                body: message.clone(),
                references: extract_references(message, titles),
            }),
            MessageRecord::Join { uid, timestamp } => Self::Presence(PresenceEvent {
                participant: participants.reference(uid),
                timestamp: *timestamp,
                action: PresenceAction::Connect,
            }),
            MessageRecord::Left { uid, timestamp } => Self::Presence(PresenceEvent {
                participant: participants.reference(uid),
                timestamp: *timestamp,
                action: PresenceAction::Disconnect,
            }),
            MessageRecord::Edit(edit) => Self::Edit(EditSummary::from_record(edit, participants)),
            MessageRecord::Retract => return None,
        };
        Some(item)
    }
}

impl EditSummary {
    #[must_use]
    pub fn from_record(record: &EditRecord, participants: &dyn ParticipantDirectory) -> Self {
        Self {
            authors: record.users.iter().map(|u| participants.reference(u)).collect(),
            documents: record.files.clone(),
            start: record.start_timestamp,
            end: record.end_timestamp,
            contents: record.file_contents.clone(),
        }
    }
}
