//! The ordered sequence of activity groups and the `add_item` algorithm.
//!
//! Group spans never overlap and increase monotonically. Items usually
//! arrive in timestamp order and are appended; a late item that lands inside
//! an incompatible group splits that group around it.
//!
//! Every structural change is queued as a [`GroupEvent`] so a live view can
//! patch itself instead of re-rendering. Each addition or removal is
//! bracketed by its `will-be` event and its completion event.

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, trace};

use super::group::ActivityGroup;
use super::item::ActivityItem;
use crate::model::{GroupId, Timestamp};

/// Default grouping window: five minutes.
pub const DEFAULT_GROUPING_WINDOW_MS: Timestamp = 5 * 60 * 1000;

/// Structural change notifications, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum GroupEvent {
    GroupWillBeAdded { group: GroupId, index: usize },
    GroupAdded { group: GroupId, index: usize },
    GroupWillBeRemoved { group: GroupId, index: usize },
    GroupRemoved { group: GroupId, index: usize },
    ItemWillBeAdded { group: GroupId },
    ItemAdded { group: GroupId, index: usize },
}

impl GroupEvent {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GroupWillBeAdded { .. } => "group-will-be-added",
            Self::GroupAdded { .. } => "group-added",
            Self::GroupWillBeRemoved { .. } => "group-will-be-removed",
            Self::GroupRemoved { .. } => "group-removed",
            Self::ItemWillBeAdded { .. } => "item-will-be-added",
            Self::ItemAdded { .. } => "item-added",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroupTimeline {
    groups: Vec<ActivityGroup>,
    window: Timestamp,
    next_group: u64,
    events: VecDeque<GroupEvent>,
}

impl Default for GroupTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_GROUPING_WINDOW_MS)
    }
}

impl GroupTimeline {
    #[must_use]
    pub const fn new(window: Timestamp) -> Self {
        Self {
            groups: Vec::new(),
            window,
            next_group: 0,
            events: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn groups(&self) -> &[ActivityGroup] {
        &self.groups
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub const fn window(&self) -> Timestamp {
        self.window
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&ActivityGroup> {
        self.groups.iter().find(|g| g.id() == id)
    }

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<GroupEvent> {
        self.events.drain(..).collect()
    }

    fn allocate_id(&mut self) -> GroupId {
        let id = GroupId(self.next_group);
        self.next_group += 1;
        id
    }

    fn insert_group(&mut self, group: ActivityGroup, index: usize) {
        let id = group.id();
        self.events
            .push_back(GroupEvent::GroupWillBeAdded { group: id, index });
        self.groups.insert(index, group);
        self.events.push_back(GroupEvent::GroupAdded { group: id, index });
    }

    fn remove_group(&mut self, index: usize) -> ActivityGroup {
        let id = self.groups[index].id();
        self.events
            .push_back(GroupEvent::GroupWillBeRemoved { group: id, index });
        let group = self.groups.remove(index);
        self.events.push_back(GroupEvent::GroupRemoved { group: id, index });
        group
    }

    fn add_to_group(&mut self, index: usize, item: ActivityItem) {
        let group = &mut self.groups[index];
        let id = group.id();
        self.events.push_back(GroupEvent::ItemWillBeAdded { group: id });
        let position = group.add_item(item);
        self.events.push_back(GroupEvent::ItemAdded {
            group: id,
            index: position,
        });
    }

    /// Place `item` into an existing group or a new one. Returns the id of
    /// the group that now holds it.
    pub fn add_item(&mut self, item: ActivityItem) -> GroupId {
        let t = item.timestamp();
        // Scan from the newest group; `cursor` is one past the candidate.
        let mut cursor = self.groups.len();
        let mut insert_at = 0;

        while cursor > 0 {
            let index = cursor - 1;
            let group = &self.groups[index];

            if group.includes(t) {
                if group.compatible_with(&item) {
                    trace!(group = %group.id(), t, "item inside compatible group");
                    self.add_to_group(index, item);
                    return self.groups[index].id();
                }
                if group.latest() == t {
                    insert_at = index + 1;
                    break;
                }
                if group.earliest() == t {
                    cursor -= 1;
                    continue;
                }

                debug!(group = %group.id(), t, "splitting group around incompatible item");
                let removed = self.remove_group(index);
                let (before_id, after_id) = (self.allocate_id(), self.allocate_id());
                let (before, after) = removed.split(t, before_id, after_id);
                let mut at = index;
                for part in [before, after].into_iter().flatten() {
                    self.insert_group(part, at);
                    at += 1;
                }
                // Resume at the later half.
                cursor = at;
                continue;
            }

            if group.latest() < t {
                let within_window = t <= group.earliest().saturating_add(self.window);
                if group.compatible_with(&item) && within_window {
                    self.add_to_group(index, item);
                    return self.groups[index].id();
                }
                insert_at = index + 1;
                break;
            }

            cursor -= 1;
        }

        let id = self.allocate_id();
        trace!(group = %id, index = insert_at, t, kind = item.kind_str(), "new group");
        self.insert_group(ActivityGroup::new(id, item), insert_at);
        id
    }

    /// Drop the trailing group if it is an edit group, as happens when the
    /// message log retracts a running edit summary. Returns the removed
    /// group.
    pub fn remove_latest_edit_group(&mut self) -> Option<ActivityGroup> {
        let last = self.groups.last()?;
        if last.kind() != super::group::GroupKind::Edit {
            return None;
        }
        let index = self.groups.len() - 1;
        Some(self.remove_group(index))
    }
}
