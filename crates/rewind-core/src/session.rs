//! A shared editing session: documents, activity feed, and participants.
//!
//! [`Session`] is the single consumer of the [`Inbox`]. Records are routed
//! strictly one at a time, so no timeline is ever touched by two records at
//! once.

use serde::Serialize;
use tracing::{debug, trace};

use crate::activity::{ActivityItem, DocumentDiff, GroupTimeline};
use crate::buffer::{BufferFactory, ScratchBufferFactory};
use crate::config::EngineConfig;
use crate::inbox::{Inbox, InboxSender};
use crate::model::{GroupId, Roster};
use crate::record::{InboundRecord, MessageRecord, RecordError};
use crate::registry::DocumentRegistry;

/// What a [`Session::pump`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PumpStats {
    pub changes: usize,
    pub messages: usize,
    pub cursors: usize,
    /// Records that were decoded but had no effect.
    pub ignored: usize,
}

impl PumpStats {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.changes + self.messages + self.cursors + self.ignored
    }
}

#[derive(Debug)]
pub struct Session {
    registry: DocumentRegistry,
    groups: GroupTimeline,
    roster: Roster,
    inbox: Inbox,
    diff_context: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&EngineConfig::default(), Box::new(ScratchBufferFactory))
    }
}

impl Session {
    #[must_use]
    pub fn new(config: &EngineConfig, factory: Box<dyn BufferFactory>) -> Self {
        Self {
            registry: DocumentRegistry::new(factory)
                .with_fuzzy_min_score(config.documents.fuzzy_min_score),
            groups: GroupTimeline::new(config.activity.grouping_window_ms),
            roster: Roster::new(),
            inbox: Inbox::new(),
            diff_context: config.activity.diff_context,
        }
    }

    /// Replace the roster. The participant marked `is_me` becomes the local
    /// participant whose cursor updates are ignored.
    #[must_use]
    pub fn with_roster(mut self, roster: Roster) -> Self {
        self.registry
            .set_local_participant(roster.me().map(|p| p.id.clone()));
        self.roster = roster;
        self
    }

    /// Producer handle for the sync layer.
    #[must_use]
    pub fn sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Route every queued record.
    pub fn pump(&mut self) -> PumpStats {
        let mut stats = PumpStats::default();
        while let Some(record) = self.inbox.try_next() {
            self.handle(record, &mut stats);
        }
        if stats.total() > 0 {
            debug!(
                changes = stats.changes,
                messages = stats.messages,
                cursors = stats.cursors,
                ignored = stats.ignored,
                "pumped inbox"
            );
        }
        stats
    }

    /// Decode and route one NDJSON line directly, bypassing the inbox.
    ///
    /// # Errors
    ///
    /// Returns the [`RecordError`] if the line does not decode.
    pub fn ingest_line(&mut self, line: &str) -> Result<PumpStats, RecordError> {
        let record = InboundRecord::from_json_line(line)?;
        let mut stats = PumpStats::default();
        self.handle(record, &mut stats);
        Ok(stats)
    }

    /// Route one already-decoded record.
    pub fn ingest(&mut self, record: InboundRecord) -> PumpStats {
        let mut stats = PumpStats::default();
        self.handle(record, &mut stats);
        stats
    }

    fn handle(&mut self, record: InboundRecord, stats: &mut PumpStats) {
        match record {
            InboundRecord::Change(change) => {
                if self.registry.route(change).is_some() {
                    stats.changes += 1;
                } else {
                    stats.ignored += 1;
                }
            }
            InboundRecord::Message(message) => {
                if self.handle_message(&message) {
                    stats.messages += 1;
                } else {
                    stats.ignored += 1;
                }
            }
            InboundRecord::Cursor(cursor) => {
                if self.registry.apply_cursor(&cursor) {
                    stats.cursors += 1;
                } else {
                    stats.ignored += 1;
                }
            }
        }
    }

    fn handle_message(&mut self, message: &MessageRecord) -> bool {
        match message {
            MessageRecord::Retract => {
                let removed = self.groups.remove_latest_edit_group();
                if removed.is_none() {
                    debug!("retraction with no trailing edit group");
                }
                return removed.is_some();
            }
            MessageRecord::Left { uid, .. } => {
                self.registry.remove_participant_cursors(uid);
            }
            MessageRecord::Text { .. } | MessageRecord::Join { .. } | MessageRecord::Edit(_) => {}
        }

        let Some(item) = ActivityItem::from_record(message, &self.roster, &self.registry) else {
            return false;
        };
        let group = self.groups.add_item(item);
        trace!(group = %group, "activity item grouped");
        true
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub const fn registry_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.registry
    }

    #[must_use]
    pub const fn groups(&self) -> &GroupTimeline {
        &self.groups
    }

    pub const fn groups_mut(&mut self) -> &mut GroupTimeline {
        &mut self.groups
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    pub const fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    /// Context lines used for unified diffs.
    #[must_use]
    pub const fn diff_context(&self) -> usize {
        self.diff_context
    }

    /// Diff summary of one edit group, titled through the registry.
    #[must_use]
    pub fn diff_summary(&self, group: GroupId) -> Option<Vec<DocumentDiff>> {
        self.groups
            .group(group)
            .map(|g| g.diff_summary(&self.registry, self.diff_context))
    }
}
