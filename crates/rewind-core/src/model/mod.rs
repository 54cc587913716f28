//! Identifiers, timestamps, and participants shared by every engine.

pub mod ids;
pub mod participant;
pub mod time;

pub use ids::{DeltaId, DocumentId, GroupId, ParseIdError, ParticipantId};
pub use participant::{Participant, ParticipantDirectory, ParticipantRef, Roster};
pub use time::{Timestamp, ViewingTimestamp};
