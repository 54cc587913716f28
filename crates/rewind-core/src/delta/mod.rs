//! Deltas: immutable records of one atomic document change.
//!
//! A [`Delta`] pairs a timestamp and an optional author with a typed
//! [`DeltaPayload`]. Every payload is invertible: the timeline applies it
//! forward with `do` and backward with `undo` (see [`crate::timeline`]).
//!
//! # Submodules
//!
//! - [`kind`]: [`DeltaKind`] enum and its wire strings
//! - [`data`]: per-kind payload structs and [`DeltaPayload`]

pub mod data;
pub mod kind;

pub use data::{
    Change, DataParseError, DeltaPayload, DestroyData, EditData, GrammarData, ModifiedData,
    OpenData, TitleData,
};
pub use kind::{DeltaKind, UnknownDeltaKind};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{ParticipantId, Timestamp};

/// One recorded change to a document.
///
/// Serialized flat, the way change records travel: `timestamp`, `author`,
/// `type` and the payload fields side by side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    pub timestamp: Timestamp,
    /// Participant who made the change, when the record names one.
    pub author: Option<ParticipantId>,
    pub payload: DeltaPayload,
}

impl Delta {
    #[must_use]
    pub const fn new(timestamp: Timestamp, payload: DeltaPayload) -> Self {
        Self {
            timestamp,
            author: None,
            payload,
        }
    }

    #[must_use]
    pub fn by(mut self, author: impl Into<String>) -> Self {
        self.author = Some(ParticipantId::new(author));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> DeltaKind {
        self.payload.kind()
    }

    // Convenience constructors, mostly for hosts and tests.

    #[must_use]
    pub fn open(timestamp: Timestamp, title: &str, grammar: &str, contents: &str) -> Self {
        Self::new(
            timestamp,
            DeltaPayload::Open(OpenData {
                grammar: grammar.to_owned(),
                title: title.to_owned(),
                contents: contents.to_owned(),
            }),
        )
    }

    #[must_use]
    pub const fn edit(timestamp: Timestamp, changes: Vec<Change>) -> Self {
        Self::new(timestamp, DeltaPayload::Edit(EditData { changes }))
    }

    #[must_use]
    pub fn title(timestamp: Timestamp, old_title: &str, new_title: &str) -> Self {
        Self::new(
            timestamp,
            DeltaPayload::Title(TitleData {
                old_title: old_title.to_owned(),
                new_title: new_title.to_owned(),
            }),
        )
    }

    #[must_use]
    pub fn grammar(timestamp: Timestamp, old_grammar: &str, new_grammar: &str) -> Self {
        Self::new(
            timestamp,
            DeltaPayload::Grammar(GrammarData {
                old_grammar: old_grammar.to_owned(),
                new_grammar: new_grammar.to_owned(),
            }),
        )
    }

    #[must_use]
    pub const fn modified(timestamp: Timestamp, old_flag: bool, new_flag: bool) -> Self {
        Self::new(
            timestamp,
            DeltaPayload::Modified(ModifiedData { old_flag, new_flag }),
        )
    }

    #[must_use]
    pub const fn destroy(timestamp: Timestamp) -> Self {
        Self::new(timestamp, DeltaPayload::Destroy(DestroyData {}))
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind(), self.timestamp)?;
        if let Some(author) = &self.author {
            write!(f, " by {author}")?;
        }
        Ok(())
    }
}

impl Change {
    /// A change whose ranges are derived from the texts, as recorded by an
    /// editor that replaced `old_text` at `start` with `new_text`.
    #[must_use]
    pub fn at(start: crate::buffer::Point, old_text: &str, new_text: &str) -> Self {
        use crate::buffer::TextRange;
        Self {
            old_range: TextRange::new(start, start.advance(old_text)),
            new_range: TextRange::new(start, start.advance(new_text)),
            old_text: old_text.to_owned(),
            new_text: new_text.to_owned(),
        }
    }
}

#[derive(Serialize)]
struct TaggedDelta<'a> {
    timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a ParticipantId>,
    #[serde(rename = "type")]
    kind: DeltaKind,
    #[serde(flatten)]
    payload: &'a DeltaPayload,
}

#[derive(Deserialize)]
struct RawDelta {
    timestamp: Timestamp,
    #[serde(default, alias = "uid")]
    author: Option<ParticipantId>,
    #[serde(rename = "type")]
    kind: DeltaKind,
    #[serde(flatten)]
    fields: serde_json::Map<String, serde_json::Value>,
}

impl Serialize for Delta {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TaggedDelta {
            timestamp: self.timestamp,
            author: self.author.as_ref(),
            kind: self.kind(),
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Delta {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawDelta::deserialize(deserializer)?;
        let payload =
            DeltaPayload::deserialize_for(raw.kind, serde_json::Value::Object(raw.fields))
                .map_err(serde::de::Error::custom)?;
        Ok(Self {
            timestamp: raw.timestamp,
            author: raw.author,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Point, TextRange};
    use serde_json::json;

    #[test]
    fn change_at_derives_ranges() {
        let change = Change::at(Point::new(1, 2), "ab", "x\ny");
        assert_eq!(
            change.old_range,
            TextRange::new(Point::new(1, 2), Point::new(1, 4))
        );
        assert_eq!(
            change.new_range,
            TextRange::new(Point::new(1, 2), Point::new(2, 1))
        );
    }

    #[test]
    fn delta_serializes_flat_with_type_tag() {
        let delta = Delta::title(10, "a.txt", "b.txt").by("u1");
        let value = serde_json::to_value(&delta).expect("serialize");
        assert_eq!(
            value,
            json!({
                "timestamp": 10,
                "author": "u1",
                "type": "title",
                "oldTitle": "a.txt",
                "newTitle": "b.txt"
            })
        );

        let back: Delta = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, delta);
    }

    #[test]
    fn display_names_kind_time_and_author() {
        assert_eq!(Delta::destroy(7).to_string(), "destroy@7");
        assert_eq!(Delta::modified(8, false, true).by("u2").to_string(), "modified@8 by u2");
    }
}
