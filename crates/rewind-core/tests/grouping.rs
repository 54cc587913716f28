use indexmap::IndexMap;
use proptest::prelude::*;
use rewind_core::activity::{
    ActivityItem, EditSummary, GroupKind, GroupTimeline, PresenceAction, PresenceEvent,
    TextMessage,
};
use rewind_core::model::{DocumentId, ParticipantId, ParticipantRef, Timestamp};
use rewind_core::record::FileContents;
use rewind_core::registry::TitleLookup;

const WINDOW: Timestamp = 300_000;

fn who(id: &str) -> ParticipantRef {
    ParticipantRef::unresolved(ParticipantId::new(id))
}

fn text(sender: &str, t: Timestamp) -> ActivityItem {
    ActivityItem::Text(TextMessage {
        sender: who(sender),
        timestamp: t,
        body: format!("at {t}"),
        references: Vec::new(),
    })
}

fn presence(t: Timestamp, action: PresenceAction) -> ActivityItem {
    ActivityItem::Presence(PresenceEvent {
        participant: who("u2"),
        timestamp: t,
        action,
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
        authors: vec![who("u1")],
        documents: vec![DocumentId::new(doc)],
        start: t,
        end: t,
        contents,
    })
}

fn bodies(timeline: &GroupTimeline) -> Vec<Vec<Timestamp>> {
    timeline
        .groups()
        .iter()
        .map(|g| g.items().iter().map(ActivityItem::timestamp).collect())
        .collect()
}

struct NoTitles;

impl TitleLookup for NoTitles {
    fn find_by_title(&self, _query: &str) -> Option<DocumentId> {
        None
    }

    fn title_of(&self, _document: &DocumentId) -> Option<String> {
        None
    }
}

#[test]
fn arrival_order_does_not_change_grouping() {
    let (a, b, c) = (text("u1", 0), text("u1", 60_000), text("u1", 400_000));

    let mut in_order = GroupTimeline::new(WINDOW);
    for item in [a.clone(), b.clone(), c.clone()] {
        in_order.add_item(item);
    }
    let mut late = GroupTimeline::new(WINDOW);
    for item in [c, a, b] {
        late.add_item(item);
    }

    assert_eq!(bodies(&in_order), [vec![0, 60_000], vec![400_000]]);
    assert_eq!(bodies(&in_order), bodies(&late));
}

#[test]
fn presence_inside_text_group_splits_it() {
    let mut tl = GroupTimeline::new(WINDOW);
    tl.add_item(text("u1", 0));
    tl.add_item(text("u1", 100));
    tl.add_item(presence(50, PresenceAction::Connect));

    let kinds: Vec<_> = tl.groups().iter().map(|g| g.kind()).collect();
    assert_eq!(kinds, [GroupKind::Text, GroupKind::Presence, GroupKind::Text]);
    assert_eq!(bodies(&tl), [vec![0], vec![50], vec![100]]);
}

#[test]
fn edit_group_diff_spans_whole_group() {
    let mut tl = GroupTimeline::new(WINDOW);
    tl.add_item(edit(10, "doc1", "a\nb", "a\nc"));
    tl.add_item(edit(20, "doc1", "a\nc", "a\nd"));
    assert_eq!(tl.len(), 1);

    let diffs = tl.groups()[0].diff_summary(&NoTitles, 3);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].before, "a\nb");
    assert_eq!(diffs[0].after, "a\nd");
    assert!(diffs[0].diff.contains("-b\n+d"));
}

fn arb_item() -> impl Strategy<Value = ActivityItem> {
    prop_oneof![
        (0usize..3).prop_map(|s| text(["u1", "u2", "u3"][s], 0)),
        any::<bool>().prop_map(|c| presence(
            0,
            if c {
                PresenceAction::Connect
            } else {
                PresenceAction::Disconnect
            }
        )),
        Just(edit(0, "doc1", "x", "y")),
    ]
}

fn with_timestamp(item: ActivityItem, t: Timestamp) -> ActivityItem {
    match item {
        ActivityItem::Text(mut m) => {
            m.timestamp = t;
            ActivityItem::Text(m)
        }
        ActivityItem::Presence(mut p) => {
            p.timestamp = t;
            ActivityItem::Presence(p)
        }
        ActivityItem::Edit(mut e) => {
            e.start = t;
            e.end = t;
            ActivityItem::Edit(e)
        }
    }
}

proptest! {
    #[test]
    fn groups_stay_sorted_disjoint_and_homogeneous(
        items in proptest::collection::vec(arb_item(), 1..40),
        stamps in proptest::collection::btree_set(0i64..2_000_000, 40)
            .prop_map(|s| s.into_iter().collect::<Vec<_>>())
            .prop_shuffle(),
    ) {
        let mut tl = GroupTimeline::new(WINDOW);
        for (item, t) in items.into_iter().zip(stamps) {
            tl.add_item(with_timestamp(item, t));
        }

        let groups = tl.groups();
        for group in groups {
            prop_assert!(!group.is_empty());
            let first = &group.items()[0];
            for pair in group.items().windows(2) {
                prop_assert!(pair[0].timestamp() <= pair[1].timestamp());
            }
            for item in group.items() {
                prop_assert_eq!(GroupKind::of(item), group.kind());
                if let (ActivityItem::Text(a), ActivityItem::Text(b)) = (first, item) {
                    prop_assert_eq!(&a.sender.id, &b.sender.id);
                }
            }
        }
        for pair in groups.windows(2) {
            prop_assert!(pair[0].latest() <= pair[1].earliest());
        }
    }
}
