use std::fmt;

/// Machine-readable error codes for logs and CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MalformedRecord,
    UnknownRecordKind,
    InvalidRecordPayload,
    UnknownDocument,
    UnknownDelta,
    PreappliedOutOfPlace,
    AnchorDegraded,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::MalformedRecord => "E2001",
            Self::UnknownRecordKind => "E2002",
            Self::InvalidRecordPayload => "E2003",
            Self::UnknownDocument => "E3001",
            Self::UnknownDelta => "E3002",
            Self::PreappliedOutOfPlace => "E3003",
            Self::AnchorDegraded => "E4001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MalformedRecord => "Malformed record line",
            Self::UnknownRecordKind => "Unknown record kind",
            Self::InvalidRecordPayload => "Invalid record payload",
            Self::UnknownDocument => "Unknown document",
            Self::UnknownDelta => "Unknown delta",
            Self::PreappliedOutOfPlace => "Pre-applied delta is not at the replay pointer",
            Self::AnchorDegraded => "Anchor could not be resolved",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .rewind/config.toml and retry."),
            Self::MalformedRecord => Some("Each log line must be one JSON object."),
            Self::UnknownRecordKind => Some(
                "Known kinds: change open/edit/title/grammar/modified/destroy, \
                 message text/join/left/edit/retract, cursor cursor/selection/remove.",
            ),
            Self::InvalidRecordPayload => None,
            Self::UnknownDocument => Some("Make sure an `open` record precedes edits."),
            Self::PreappliedOutOfPlace => {
                Some("Hydrate history in timestamp order while viewing the latest state.")
            }
            Self::UnknownDelta | Self::AnchorDegraded => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
