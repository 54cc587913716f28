//! Typed payloads for each delta kind.
//!
//! Field names follow the synchronization layer's camelCase record schema.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::kind::DeltaKind;
use crate::buffer::TextRange;

// ---------------------------------------------------------------------------
// DeltaPayload
// ---------------------------------------------------------------------------

/// Typed payload of a delta. The discriminant is the record's `type` field,
/// external to the payload object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaPayload {
    Open(OpenData),
    Edit(EditData),
    Title(TitleData),
    Grammar(GrammarData),
    Modified(ModifiedData),
    Destroy(DestroyData),
}

impl DeltaPayload {
    #[must_use]
    pub const fn kind(&self) -> DeltaKind {
        match self {
            Self::Open(_) => DeltaKind::Open,
            Self::Edit(_) => DeltaKind::Edit,
            Self::Title(_) => DeltaKind::Title,
            Self::Grammar(_) => DeltaKind::Grammar,
            Self::Modified(_) => DeltaKind::Modified,
            Self::Destroy(_) => DeltaKind::Destroy,
        }
    }

    /// Deserialize a payload object for a known kind.
    ///
    /// # Errors
    ///
    /// Returns a [`DataParseError`] if the object does not match the schema
    /// for `kind`.
    pub fn deserialize_for(
        kind: DeltaKind,
        value: serde_json::Value,
    ) -> Result<Self, DataParseError> {
        let result = match kind {
            DeltaKind::Open => serde_json::from_value::<OpenData>(value).map(Self::Open),
            DeltaKind::Edit => serde_json::from_value::<EditData>(value).map(Self::Edit),
            DeltaKind::Title => serde_json::from_value::<TitleData>(value).map(Self::Title),
            DeltaKind::Grammar => {
                serde_json::from_value::<GrammarData>(value).map(Self::Grammar)
            }
            DeltaKind::Modified => {
                serde_json::from_value::<ModifiedData>(value).map(Self::Modified)
            }
            DeltaKind::Destroy => {
                serde_json::from_value::<DestroyData>(value).map(Self::Destroy)
            }
        };

        result.map_err(|source| DataParseError { kind, source })
    }
}

impl Serialize for DeltaPayload {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Open(d) => d.serialize(serializer),
            Self::Edit(d) => d.serialize(serializer),
            Self::Title(d) => d.serialize(serializer),
            Self::Grammar(d) => d.serialize(serializer),
            Self::Modified(d) => d.serialize(serializer),
            Self::Destroy(d) => d.serialize(serializer),
        }
    }
}

/// Error returned when a delta payload does not match its kind's schema.
#[derive(Debug)]
pub struct DataParseError {
    pub kind: DeltaKind,
    pub source: serde_json::Error,
}

impl fmt::Display for DataParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} payload: {}", self.kind, self.source)
    }
}

impl std::error::Error for DataParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Payload for `open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenData {
    #[serde(rename = "grammarName", default)]
    pub grammar: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub contents: String,
}

/// Payload for `edit`: replacements applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditData {
    pub changes: Vec<Change>,
}

/// A single text replacement.
///
/// Ranges are relative to the document at the moment the change was first
/// recorded: `old_range` covers `old_text` before the change, `new_range`
/// covers `new_text` after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub old_range: TextRange,
    pub new_range: TextRange,
    #[serde(default)]
    pub old_text: String,
    #[serde(default)]
    pub new_text: String,
}

/// Payload for `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleData {
    #[serde(default)]
    pub old_title: String,
    pub new_title: String,
}

/// Payload for `grammar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarData {
    #[serde(rename = "oldGrammarName", default)]
    pub old_grammar: String,
    #[serde(rename = "newGrammarName")]
    pub new_grammar: String,
}

/// Payload for `modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedData {
    #[serde(rename = "oldModified", default)]
    pub old_flag: bool,
    #[serde(rename = "modified")]
    pub new_flag: bool,
}

/// Payload for `destroy` (no fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DestroyData {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Point;
    use serde_json::json;

    #[test]
    fn edit_payload_reads_wire_ranges() {
        let value = json!({
            "changes": [{
                "oldRange": {"start": [0, 0], "end": [0, 3]},
                "newRange": {"start": [0, 0], "end": [0, 1]},
                "oldText": "abc",
                "newText": "z"
            }]
        });
        let payload = DeltaPayload::deserialize_for(DeltaKind::Edit, value).expect("parse");
        let DeltaPayload::Edit(edit) = payload else {
            panic!("expected edit payload");
        };
        assert_eq!(edit.changes.len(), 1);
        assert_eq!(edit.changes[0].old_range.end, Point::new(0, 3));
        assert_eq!(edit.changes[0].new_text, "z");
    }

    #[test]
    fn wire_names_for_scalar_payloads() {
        let grammar = DeltaPayload::deserialize_for(
            DeltaKind::Grammar,
            json!({"oldGrammarName": "text", "newGrammarName": "rust"}),
        )
        .expect("parse grammar");
        assert_eq!(grammar.kind(), DeltaKind::Grammar);

        let modified = DeltaPayload::deserialize_for(
            DeltaKind::Modified,
            json!({"oldModified": false, "modified": true}),
        )
        .expect("parse modified");
        assert_eq!(
            modified,
            DeltaPayload::Modified(ModifiedData {
                old_flag: false,
                new_flag: true
            })
        );

        let open = DeltaPayload::deserialize_for(
            DeltaKind::Open,
            json!({"grammarName": "rust", "title": "main.rs", "contents": "fn main() {}"}),
        )
        .expect("parse open");
        assert_eq!(
            serde_json::to_value(&open).expect("serialize"),
            json!({"grammarName": "rust", "title": "main.rs", "contents": "fn main() {}"})
        );
    }

    #[test]
    fn destroy_ignores_extra_fields() {
        let payload = DeltaPayload::deserialize_for(DeltaKind::Destroy, json!({"why": "closed"}))
            .expect("parse destroy");
        assert_eq!(payload, DeltaPayload::Destroy(DestroyData {}));
    }

    #[test]
    fn schema_mismatch_reports_kind() {
        let err = DeltaPayload::deserialize_for(DeltaKind::Title, json!({"oldTitle": "a"}))
            .expect_err("missing newTitle");
        assert_eq!(err.kind, DeltaKind::Title);
        assert!(err.to_string().starts_with("invalid title payload"));
    }
}
