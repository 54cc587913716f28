use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error parsing a prefixed numeric id such as `d3` or `g12`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {prefix}-id '{raw}' (expected {prefix}<number>)")]
pub struct ParseIdError {
    pub prefix: char,
    pub raw: String,
}

fn parse_prefixed(raw: &str, prefix: char) -> Result<u64, ParseIdError> {
    let digits = raw.trim().strip_prefix(prefix).unwrap_or_else(|| raw.trim());
    digits.parse().map_err(|_| ParseIdError {
        prefix,
        raw: raw.to_owned(),
    })
}

/// Identifier of a shared document, assigned by the synchronization layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a session participant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Arrival-order identity of a delta inside one document timeline.
///
/// Assigned monotonically on insertion; unlike the delta's position in the
/// log it never changes when earlier-timestamped deltas arrive later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeltaId(pub u64);

impl fmt::Display for DeltaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.0)
    }
}

impl FromStr for DeltaId {
    type Err = ParseIdError;

    /// Accepts `d3` or a bare `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, 'd').map(Self)
    }
}

/// Stable identity of an activity group, used in group timeline events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, 'g').map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_serializes_as_plain_string() {
        let id = DocumentId::new("doc-1");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"doc-1\"");
        let back: DocumentId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn display_prefixes_numeric_ids() {
        assert_eq!(DeltaId(7).to_string(), "d7");
        assert_eq!(GroupId(3).to_string(), "g3");
    }

    #[test]
    fn numeric_ids_parse_with_or_without_prefix() {
        assert_eq!("d7".parse::<DeltaId>(), Ok(DeltaId(7)));
        assert_eq!("7".parse::<DeltaId>(), Ok(DeltaId(7)));
        assert_eq!("g3".parse::<GroupId>(), Ok(GroupId(3)));
        assert!("g3".parse::<DeltaId>().is_err());
    }
}
