//! The activity feed: items from the message log and their grouping.

pub mod diff;
pub mod group;
pub mod item;
pub mod reference;
pub mod timeline;

pub use diff::{DEFAULT_CONTEXT, unified_diff};
pub use group::{ActivityGroup, DocumentDiff, GroupKind};
pub use item::{ActivityItem, EditSummary, PresenceAction, PresenceEvent, TextMessage};
pub use reference::{FileReference, LinePosition, extract_references, parse_reference};
pub use timeline::{DEFAULT_GROUPING_WINDOW_MS, GroupEvent, GroupTimeline};
