//! Delta kind enum covering the six document change kinds.
//!
//! The string form is the `type` field used by the synchronization layer's
//! change records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six kinds of recorded document change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    /// A document was opened with initial contents.
    Open,
    /// One or more text replacements.
    Edit,
    /// The document title changed.
    Title,
    /// The grammar (syntax mode) changed.
    Grammar,
    /// The unsaved-changes flag flipped.
    Modified,
    /// The document was closed.
    Destroy,
}

/// Error returned when parsing an unknown delta kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDeltaKind {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownDeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown delta kind '{}': expected one of open, edit, title, grammar, \
             modified, destroy",
            self.raw
        )
    }
}

impl std::error::Error for UnknownDeltaKind {}

impl DeltaKind {
    /// All known kinds in wire order.
    pub const ALL: [Self; 6] = [
        Self::Open,
        Self::Edit,
        Self::Title,
        Self::Grammar,
        Self::Modified,
        Self::Destroy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Edit => "edit",
            Self::Title => "title",
            Self::Grammar => "grammar",
            Self::Modified => "modified",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeltaKind {
    type Err = UnknownDeltaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "edit" => Ok(Self::Edit),
            "title" => Ok(Self::Title),
            "grammar" => Ok(Self::Grammar),
            "modified" => Ok(Self::Modified),
            "destroy" => Ok(Self::Destroy),
            _ => Err(UnknownDeltaKind { raw: s.to_string() }),
        }
    }
}

impl Serialize for DeltaKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeltaKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
