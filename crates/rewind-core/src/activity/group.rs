//! Activity groups: non-empty, time-sorted runs of compatible items.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use super::diff::unified_diff;
use super::item::{ActivityItem, PresenceAction};
use crate::model::{DocumentId, GroupId, ParticipantRef, Timestamp};
use crate::registry::TitleLookup;

/// The kind of items a group holds, fixed by its first item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Text,
    Presence,
    Edit,
}

impl GroupKind {
    #[must_use]
    pub const fn of(item: &ActivityItem) -> Self {
        match item {
            ActivityItem::Text(_) => Self::Text,
            ActivityItem::Presence(_) => Self::Presence,
            ActivityItem::Edit(_) => Self::Edit,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Presence => "presence",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diff of one document across an edit group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDiff {
    pub document: DocumentId,
    pub title: String,
    pub before: String,
    pub after: String,
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityGroup {
    id: GroupId,
    kind: GroupKind,
    items: Vec<ActivityItem>,
}

impl ActivityGroup {
    /// A singleton group whose kind follows `first`.
    #[must_use]
    pub fn new(id: GroupId, first: ActivityItem) -> Self {
        Self {
            id,
            kind: GroupKind::of(&first),
            items: vec![first],
        }
    }

    /// A group over already-sorted items of one kind. `None` if empty.
    fn from_sorted(id: GroupId, kind: GroupKind, items: Vec<ActivityItem>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self { id, kind, items })
    }

    #[must_use]
    pub const fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> GroupKind {
        self.kind
    }

    #[must_use]
    pub fn items(&self) -> &[ActivityItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn earliest(&self) -> Timestamp {
        self.items.first().map_or(Timestamp::MIN, ActivityItem::timestamp)
    }

    #[must_use]
    pub fn latest(&self) -> Timestamp {
        self.items.last().map_or(Timestamp::MAX, ActivityItem::timestamp)
    }

    /// Whether `t` lies within `[earliest, latest]`.
    #[must_use]
    pub fn includes(&self, t: Timestamp) -> bool {
        self.earliest() <= t && t <= self.latest()
    }

    /// Whether `item` may join this group.
    #[must_use]
    pub fn compatible_with(&self, item: &ActivityItem) -> bool {
        match (self.items.first(), item) {
            (Some(ActivityItem::Text(first)), ActivityItem::Text(next)) => {
                first.sender.id == next.sender.id
            }
            (Some(ActivityItem::Presence(first)), ActivityItem::Presence(next)) => {
                first.action == next.action
            }
            (Some(ActivityItem::Edit(_)), ActivityItem::Edit(_)) => true,
            _ => false,
        }
    }

    /// Position `t` would be inserted at: after every item strictly
    /// earlier than `t`.
    #[must_use]
    pub fn insertion_index(&self, t: Timestamp) -> usize {
        self.items.partition_point(|i| i.timestamp() < t)
    }

    /// Insert keeping timestamp order. Returns the item's index.
    pub(crate) fn add_item(&mut self, item: ActivityItem) -> usize {
        let index = self.insertion_index(item.timestamp());
        self.items.insert(index, item);
        index
    }

    /// Split into the items before `t` and the items at or after `t`. Empty
    /// halves are omitted.
    pub(crate) fn split(
        self,
        t: Timestamp,
        before_id: GroupId,
        after_id: GroupId,
    ) -> (Option<Self>, Option<Self>) {
        let index = self.insertion_index(t);
        let mut before = self.items;
        let after = before.split_off(index);
        (
            Self::from_sorted(before_id, self.kind, before),
            Self::from_sorted(after_id, self.kind, after),
        )
    }

    // -----------------------------------------------------------------------
    // Kind-specific accessors
    // -----------------------------------------------------------------------

    /// Sender of a text group.
    #[must_use]
    pub fn sender(&self) -> Option<&ParticipantRef> {
        match self.items.first()? {
            ActivityItem::Text(m) => Some(&m.sender),
            _ => None,
        }
    }

    /// Direction of a presence group.
    #[must_use]
    pub fn is_connect(&self) -> Option<bool> {
        match self.items.first()? {
            ActivityItem::Presence(p) => Some(p.action == PresenceAction::Connect),
            _ => None,
        }
    }

    /// Distinct participants of a presence group, in order of appearance.
    #[must_use]
    pub fn participants(&self) -> Vec<&ParticipantRef> {
        let mut seen = IndexMap::new();
        for item in &self.items {
            if let ActivityItem::Presence(p) = item {
                seen.entry(&p.participant.id).or_insert(&p.participant);
            }
        }
        seen.into_values().collect()
    }

    /// Distinct authors of an edit group, in order of appearance.
    #[must_use]
    pub fn authors(&self) -> Vec<&ParticipantRef> {
        let mut seen = IndexMap::new();
        for item in &self.items {
            if let ActivityItem::Edit(e) = item {
                for author in &e.authors {
                    seen.entry(&author.id).or_insert(author);
                }
            }
        }
        seen.into_values().collect()
    }

    /// Distinct documents touched by an edit group, in order of appearance.
    #[must_use]
    pub fn documents(&self) -> Vec<&DocumentId> {
        let mut seen: Vec<&DocumentId> = Vec::new();
        for item in &self.items {
            if let ActivityItem::Edit(e) = item {
                for document in e.documents.iter().chain(e.contents.keys()) {
                    if !seen.contains(&document) {
                        seen.push(document);
                    }
                }
            }
        }
        seen
    }

    /// Per-document diff of an edit group: the first recorded content before
    /// against the last recorded content after. Empty for other kinds.
    #[must_use]
    pub fn diff_summary(&self, titles: &dyn TitleLookup, context: usize) -> Vec<DocumentDiff> {
        let mut spans: IndexMap<&DocumentId, (&str, &str)> = IndexMap::new();
        for item in &self.items {
            let ActivityItem::Edit(edit) = item else {
                continue;
            };
            for (document, contents) in &edit.contents {
                spans
                    .entry(document)
                    .and_modify(|(_, after)| *after = contents.value_after.as_str())
                    .or_insert((contents.value_before.as_str(), contents.value_after.as_str()));
            }
        }

        spans
            .into_iter()
            .map(|(document, (before, after))| {
                let title = titles
                    .title_of(document)
                    .unwrap_or_else(|| document.as_str().to_owned());
                DocumentDiff {
                    document: document.clone(),
                    diff: unified_diff(&title, before, after, context),
                    title,
                    before: before.to_owned(),
                    after: after.to_owned(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::item::{EditSummary, PresenceEvent, TextMessage};
    use crate::model::ParticipantId;
    use crate::record::FileContents;

    struct Titles;

    impl TitleLookup for Titles {
        fn find_by_title(&self, _query: &str) -> Option<DocumentId> {
            None
        }

        fn title_of(&self, document: &DocumentId) -> Option<String> {
            (document.as_str() == "doc1").then(|| "notes.txt".to_owned())
        }
    }

    fn text(sender: &str, t: Timestamp) -> ActivityItem {
        ActivityItem::Text(TextMessage {
            sender: ParticipantRef::unresolved(ParticipantId::new(sender)),
            timestamp: t,
            body: format!("msg {t}"),
            references: Vec::new(),
        })
    }

    fn join(who: &str, t: Timestamp) -> ActivityItem {
        ActivityItem::Presence(PresenceEvent {
            participant: ParticipantRef::unresolved(ParticipantId::new(who)),
            timestamp: t,
            action: PresenceAction::Connect,
        })
    }

    fn edit(t: Timestamp, doc: &str, before: &str, after: &str) -> ActivityItem {
        let mut contents = IndexMap::new();
        contents.insert(
            DocumentId::new(doc),
            FileContents {
                value_before: before.into(),
                value_after: after.into(),
            },
        );
        ActivityItem::Edit(EditSummary {
            authors: vec![ParticipantRef::unresolved(ParticipantId::new("u1"))],
            documents: vec![DocumentId::new(doc)],
            start: t - 1,
            end: t,
            contents,
        })
    }

    #[test]
    fn text_groups_require_same_sender() {
        let group = ActivityGroup::new(GroupId(0), text("u1", 0));
        assert!(group.compatible_with(&text("u1", 5)));
        assert!(!group.compatible_with(&text("u2", 5)));
        assert!(!group.compatible_with(&join("u1", 5)));
        assert_eq!(group.sender().map(|s| s.id.as_str()), Some("u1"));
    }

    #[test]
    fn items_stay_sorted() {
        let mut group = ActivityGroup::new(GroupId(0), text("u1", 10));
        assert_eq!(group.add_item(text("u1", 30)), 1);
        assert_eq!(group.add_item(text("u1", 20)), 1);
        assert_eq!(group.add_item(text("u1", 0)), 0);
        let stamps: Vec<_> = group.items().iter().map(ActivityItem::timestamp).collect();
        assert_eq!(stamps, [0, 10, 20, 30]);
        assert!(group.includes(30));
        assert!(!group.includes(31));
    }

    #[test]
    fn split_keeps_order_and_drops_empty_halves() {
        let mut group = ActivityGroup::new(GroupId(0), text("u1", 0));
        group.add_item(text("u1", 40));
        group.add_item(text("u1", 100));
        let (before, after) = group.clone().split(50, GroupId(1), GroupId(2));
        let before = before.expect("before");
        let after = after.expect("after");
        assert_eq!(before.len(), 2);
        assert_eq!(after.earliest(), 100);
        assert_eq!(after.kind(), GroupKind::Text);

        let (none, all) = group.split(0, GroupId(3), GroupId(4));
        assert!(none.is_none());
        assert_eq!(all.map(|g| g.len()), Some(3));
    }

    #[test]
    fn presence_direction_and_participants() {
        let mut group = ActivityGroup::new(GroupId(0), join("u1", 0));
        group.add_item(join("u2", 1));
        group.add_item(join("u1", 2));
        assert_eq!(group.is_connect(), Some(true));
        assert_eq!(group.participants().len(), 2);
        assert_eq!(group.sender(), None);
    }

    #[test]
    fn diff_uses_first_before_and_last_after() {
        let mut group = ActivityGroup::new(GroupId(0), edit(10, "doc1", "a\nb", "a\nc"));
        group.add_item(edit(20, "doc1", "a\nc", "a\nd"));
        group.add_item(edit(30, "doc2", "x", "x"));

        let diffs = group.diff_summary(&Titles, 3);
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].document.as_str(), "doc1");
        assert_eq!(diffs[0].before, "a\nb");
        assert_eq!(diffs[0].after, "a\nd");
        assert_eq!(
            diffs[0].diff,
            "--- notes.txt\n+++ notes.txt\n@@ -1,2 +1,2 @@\n a\n-b\n+d"
        );
        assert_eq!(diffs[1].title, "doc2");
        assert!(diffs[1].diff.is_empty());

        assert_eq!(group.authors().len(), 1);
        assert_eq!(group.documents().len(), 2);
    }
}
