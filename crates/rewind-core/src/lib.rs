//! rewind-core library.
//!
//! Time-travel replay for shared documents and a grouped activity feed.
//!
//! - [`timeline::DocumentTimeline`] keeps a document's deltas in timestamp
//!   order and a replay pointer that scrubbing moves forward or back.
//! - [`registry::DocumentRegistry`] owns every timeline and the global
//!   viewing timestamp.
//! - [`activity::GroupTimeline`] folds activity items into groups of
//!   compatible, temporally close items.
//! - [`session::Session`] drains the [`inbox::Inbox`] and routes each record.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums in the library, each mapped to an
//!   [`error::ErrorCode`]. Config loading uses `anyhow::Result`.
//! - **Logging**: `tracing` macros. Dropped records and degraded anchors log
//!   at `warn!` with a `code` field.
//! - **Events**: engines queue events and callers drain them.

pub mod activity;
pub mod anchor;
pub mod buffer;
pub mod config;
pub mod cursor;
pub mod delta;
pub mod error;
pub mod fuzzy;
pub mod inbox;
pub mod model;
pub mod record;
pub mod registry;
pub mod session;
pub mod timeline;

pub use activity::{ActivityGroup, ActivityItem, GroupEvent, GroupKind, GroupTimeline};
pub use buffer::{Point, ScratchBuffer, TextBuffer, TextRange};
pub use config::EngineConfig;
pub use delta::{Change, Delta, DeltaKind, DeltaPayload};
pub use error::ErrorCode;
pub use model::{DeltaId, DocumentId, GroupId, ParticipantId, Timestamp, ViewingTimestamp};
pub use record::{InboundRecord, RecordError};
pub use registry::{DocumentRegistry, RegistryEvent};
pub use session::Session;
pub use timeline::DocumentTimeline;
