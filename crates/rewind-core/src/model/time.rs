//! Millisecond timestamps and the viewing-timestamp sentinel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock milliseconds since the Unix epoch, as stamped by the sync layer.
pub type Timestamp = i64;

/// The moment a consumer wants documents materialized as of.
///
/// Serialized as `null` for [`ViewingTimestamp::Latest`] and as a number
/// otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<Timestamp>", into = "Option<Timestamp>")]
pub enum ViewingTimestamp {
    /// Follow the present: every delta is applied and documents are editable.
    #[default]
    Latest,
    /// A historical moment: deltas with a later timestamp are rolled back.
    At(Timestamp),
}

impl ViewingTimestamp {
    #[must_use]
    pub const fn is_latest(self) -> bool {
        matches!(self, Self::Latest)
    }

    #[must_use]
    pub const fn at(self) -> Option<Timestamp> {
        match self {
            Self::Latest => None,
            Self::At(ts) => Some(ts),
        }
    }
}

impl From<Option<Timestamp>> for ViewingTimestamp {
    fn from(value: Option<Timestamp>) -> Self {
        value.map_or(Self::Latest, Self::At)
    }
}

impl From<ViewingTimestamp> for Option<Timestamp> {
    fn from(value: ViewingTimestamp) -> Self {
        value.at()
    }
}

impl fmt::Display for ViewingTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::At(ts) => write!(f, "{ts}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_round_trips_as_null() {
        let json = serde_json::to_string(&ViewingTimestamp::Latest).expect("serialize");
        assert_eq!(json, "null");
        let parsed: ViewingTimestamp = serde_json::from_str("1500").expect("deserialize");
        assert_eq!(parsed, ViewingTimestamp::At(1500));
    }

    #[test]
    fn default_is_latest() {
        assert!(ViewingTimestamp::default().is_latest());
        assert_eq!(ViewingTimestamp::At(4).at(), Some(4));
    }
}
