//! Inbound records from the synchronization layer.
//!
//! A session log is NDJSON: one JSON object per line, tagged by `stream`:
//!
//! ```text
//! {"stream":"change","document":"doc1","type":"open","timestamp":0,"uid":"u1","title":"a.rs","grammarName":"rust","contents":""}
//! {"stream":"message","type":"text","uid":"u1","timestamp":5,"message":"hi"}
//! {"stream":"cursor","type":"cursor","document":"doc1","uid":"u2","position":[0,3]}
//! ```
//!
//! Parsing is two-pass: the envelope (`stream`, `type`) is checked first so
//! an unknown kind is reported as such rather than as a schema mismatch.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::buffer::{Point, TextRange};
use crate::delta::Delta;
use crate::error::ErrorCode;
use crate::model::{DocumentId, ParticipantId, Timestamp};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Which record stream a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Change,
    Message,
    Cursor,
}

impl Stream {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Change => "change",
            Self::Message => "message",
            Self::Cursor => "cursor",
        }
    }

    const fn known_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Change => &["open", "edit", "title", "grammar", "modified", "destroy"],
            Self::Message => &["text", "join", "left", "edit", "retract"],
            Self::Cursor => &["cursor", "selection", "remove"],
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while decoding one inbound record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("unknown record stream '{0}'")]
    UnknownStream(String),

    #[error("unknown {stream} record kind '{kind}'")]
    UnknownKind { stream: Stream, kind: String },

    #[error("invalid {stream} '{kind}' record: {source}")]
    InvalidPayload {
        stream: Stream,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RecordError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) | Self::UnknownStream(_) => ErrorCode::MalformedRecord,
            Self::UnknownKind { .. } => ErrorCode::UnknownRecordKind,
            Self::InvalidPayload { .. } => ErrorCode::InvalidRecordPayload,
        }
    }
}

// ---------------------------------------------------------------------------
// Change records
// ---------------------------------------------------------------------------

/// A delta addressed to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub document: DocumentId,
    pub delta: Delta,
}

impl ChangeRecord {
    #[must_use]
    pub const fn new(document: DocumentId, delta: Delta) -> Self {
        Self { document, delta }
    }
}

// ---------------------------------------------------------------------------
// Message records
// ---------------------------------------------------------------------------

/// Before/after contents of one document inside an edit summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContents {
    #[serde(default)]
    pub value_before: String,
    #[serde(default)]
    pub value_after: String,
}

/// Running summary of who edited which documents over a time span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    #[serde(default)]
    pub users: Vec<ParticipantId>,
    #[serde(default)]
    pub files: Vec<DocumentId>,
    pub start_timestamp: Timestamp,
    pub end_timestamp: Timestamp,
    #[serde(default)]
    pub file_contents: IndexMap<DocumentId, FileContents>,
}

/// An entry of the shared activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageRecord {
    Text {
        uid: ParticipantId,
        timestamp: Timestamp,
        message: String,
    },
    Join {
        uid: ParticipantId,
        timestamp: Timestamp,
    },
    Left {
        uid: ParticipantId,
        timestamp: Timestamp,
    },
    Edit(EditRecord),
    /// The log dropped its last entry so a running edit summary can be
    /// rewritten.
    Retract,
}

// ---------------------------------------------------------------------------
// Cursor records
// ---------------------------------------------------------------------------

/// A remote participant's cursor or selection update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CursorRecord {
    Cursor {
        document: DocumentId,
        uid: ParticipantId,
        position: Point,
    },
    Selection {
        document: DocumentId,
        uid: ParticipantId,
        range: TextRange,
    },
    Remove {
        document: DocumentId,
        uid: ParticipantId,
    },
}

impl CursorRecord {
    #[must_use]
    pub const fn document(&self) -> &DocumentId {
        match self {
            Self::Cursor { document, .. }
            | Self::Selection { document, .. }
            | Self::Remove { document, .. } => document,
        }
    }
}

// ---------------------------------------------------------------------------
// InboundRecord
// ---------------------------------------------------------------------------

/// One decoded line of a session log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRecord {
    Change(ChangeRecord),
    Message(MessageRecord),
    Cursor(CursorRecord),
}

impl InboundRecord {
    #[must_use]
    pub const fn stream(&self) -> Stream {
        match self {
            Self::Change(_) => Stream::Change,
            Self::Message(_) => Stream::Message,
            Self::Cursor(_) => Stream::Cursor,
        }
    }

    /// Decode one NDJSON line.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] when the line is not a JSON object, names an
    /// unknown stream or kind, or does not match the kind's schema.
    pub fn from_json_line(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| RecordError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON object.
    ///
    /// # Errors
    ///
    /// See [`InboundRecord::from_json_line`].
    pub fn from_value(mut value: Value) -> Result<Self, RecordError> {
        let Some(object) = value.as_object_mut() else {
            return Err(RecordError::Malformed("expected a JSON object".into()));
        };

        let stream = match object.remove("stream") {
            Some(Value::String(s)) => match s.as_str() {
                "change" => Stream::Change,
                "message" => Stream::Message,
                "cursor" => Stream::Cursor,
                _ => return Err(RecordError::UnknownStream(s)),
            },
            Some(_) => return Err(RecordError::Malformed("`stream` must be a string".into())),
            None => return Err(RecordError::Malformed("missing `stream` field".into())),
        };

        let kind = match object.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(RecordError::Malformed("`type` must be a string".into())),
            None => return Err(RecordError::Malformed("missing `type` field".into())),
        };
        if !stream.known_kinds().contains(&kind.as_str()) {
            return Err(RecordError::UnknownKind { stream, kind });
        }

        let invalid = |source| RecordError::InvalidPayload {
            stream,
            kind: kind.clone(),
            source,
        };

        match stream {
            Stream::Change => {
                let document = match object.remove("document") {
                    Some(Value::String(s)) => DocumentId::new(s),
                    _ => {
                        return Err(RecordError::Malformed(
                            "change record needs a string `document`".into(),
                        ));
                    }
                };
                let delta: Delta = serde_json::from_value(value).map_err(invalid)?;
                Ok(Self::Change(ChangeRecord { document, delta }))
            }
            Stream::Message => serde_json::from_value(value)
                .map(Self::Message)
                .map_err(invalid),
            Stream::Cursor => serde_json::from_value(value)
                .map(Self::Cursor)
                .map_err(invalid),
        }
    }

    /// Encode as one NDJSON line (without the trailing newline).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut value = match self {
            Self::Change(record) => {
                let mut value = serde_json::to_value(&record.delta)?;
                if let Some(object) = value.as_object_mut() {
                    object.insert(
                        "document".into(),
                        Value::String(record.document.as_str().to_owned()),
                    );
                }
                value
            }
            Self::Message(record) => serde_json::to_value(record)?,
            Self::Cursor(record) => serde_json::to_value(record)?,
        };
        if let Some(object) = value.as_object_mut() {
            object.insert("stream".into(), Value::String(self.stream().as_str().into()));
        }
        serde_json::to_string(&value)
    }
}
