use proptest::prelude::*;
use rewind_core::buffer::{Point, ScratchBuffer, TextBuffer, TextRange};
use rewind_core::delta::{Change, Delta};
use rewind_core::model::{DocumentId, Timestamp, ViewingTimestamp};
use rewind_core::timeline::{DocumentTimeline, InsertMode};

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Raw edit choices; resolved against the live text by `build_edits`.
#[derive(Debug, Clone)]
struct EditOp {
    row: u32,
    column: u32,
    delete: u32,
    insert: String,
}

fn arb_op() -> impl Strategy<Value = EditOp> {
    (0u32..16, 0u32..16, 0u32..4, "[a-z\n]{0,4}").prop_map(|(row, column, delete, insert)| {
        EditOp {
            row,
            column,
            delete,
            insert,
        }
    })
}

fn arb_contents() -> impl Strategy<Value = String> {
    "[a-z \n]{0,24}"
}

/// Turn raw ops into deltas whose ranges are valid against the document as
/// it stands after every earlier delta. Timestamps are `10, 20, ...`.
fn build_edits(contents: &str, ops: &[EditOp]) -> Vec<Delta> {
    let mut live = ScratchBuffer::with_text(contents);
    let mut deltas = Vec::with_capacity(ops.len());
    for (i, op) in ops.iter().enumerate() {
        let lines = live.lines();
        let row = op.row % u32::try_from(lines.len()).expect("line count");
        let len = u32::try_from(lines[row as usize].chars().count()).expect("line length");
        let column = op.column % (len + 1);
        let end = (column + op.delete).min(len);

        let range = TextRange::new(Point::new(row, column), Point::new(row, end));
        let old_text = live.text_in_range(range).expect("range in bounds");
        let change = Change::at(range.start, &old_text, &op.insert);
        live.replace_text(range, &op.insert);

        let ts = Timestamp::try_from(i + 1).expect("timestamp") * 10;
        deltas.push(Delta::edit(ts, vec![change]));
    }
    deltas
}

/// Apply every delta's forward action once, in order, to a fresh buffer.
fn fold(contents: &str, edits: &[Delta]) -> String {
    let mut buffer = ScratchBuffer::with_text(contents);
    for delta in edits {
        if let rewind_core::DeltaPayload::Edit(edit) = &delta.payload {
            for change in &edit.changes {
                buffer.replace_text(change.old_range, &change.new_text);
            }
        }
    }
    buffer.text()
}

fn fresh() -> DocumentTimeline {
    DocumentTimeline::new(DocumentId::new("doc"), Box::new(ScratchBuffer::new()))
}

fn loaded(contents: &str, edits: &[Delta]) -> DocumentTimeline {
    let mut tl = fresh();
    tl.insert(Delta::open(0, "doc.txt", "text", contents), InsertMode::Apply);
    for delta in edits {
        tl.insert(delta.clone(), InsertMode::Apply);
    }
    tl
}

/// Deterministic xorshift permutation of `items`.
fn permuted<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    let mut shuffled = items.to_vec();
    let mut state = seed | 1;
    for i in (1..shuffled.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let bound = u64::try_from(i + 1).expect("index");
        let j = usize::try_from(state % bound).expect("index");
        shuffled.swap(i, j);
    }
    shuffled
}

fn arrived(contents: &str, order: Vec<Delta>) -> DocumentTimeline {
    let mut tl = fresh();
    tl.insert(Delta::open(0, "doc.txt", "text", contents), InsertMode::Apply);
    for delta in order {
        tl.insert(delta, InsertMode::Apply);
    }
    tl
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn same_viewing_timestamp_twice_replays_nothing(
        contents in arb_contents(),
        ops in proptest::collection::vec(arb_op(), 0..12),
        stops in proptest::collection::vec(-5i64..150, 1..8),
    ) {
        let edits = build_edits(&contents, &ops);
        let mut tl = loaded(&contents, &edits);
        for t in stops {
            tl.set_viewing_timestamp(ViewingTimestamp::At(t));
            let stats = tl.stats();
            tl.set_viewing_timestamp(ViewingTimestamp::At(t));
            prop_assert_eq!(tl.stats(), stats);
        }
    }

    #[test]
    fn scrubbing_back_then_latest_round_trips(
        contents in arb_contents(),
        ops in proptest::collection::vec(arb_op(), 0..12),
        stops in proptest::collection::vec(-5i64..150, 0..8),
    ) {
        let edits = build_edits(&contents, &ops);
        let expected = fold(&contents, &edits);

        let mut tl = loaded(&contents, &edits);
        prop_assert_eq!(tl.text(), expected.clone());

        for t in stops {
            tl.set_viewing_timestamp(ViewingTimestamp::At(t));
            let applied = tl.replay_pointer();
            prop_assert_eq!(tl.text(), tl.materialize_at(applied));
        }
        tl.set_viewing_timestamp(ViewingTimestamp::Latest);
        prop_assert_eq!(tl.text(), expected);
        prop_assert_eq!(tl.degraded_anchors(), 0);
    }

    #[test]
    fn arrival_order_does_not_change_final_text(
        contents in arb_contents(),
        ops in proptest::collection::vec(arb_op(), 1..10),
        order_seed in any::<u64>(),
    ) {
        let edits = build_edits(&contents, &ops);
        let expected = fold(&contents, &edits);
        prop_assert_eq!(loaded(&contents, &edits).text(), expected.clone());

        let mut tl = arrived(&contents, permuted(&edits, order_seed));
        prop_assert_eq!(tl.text(), expected.clone());
        let stamps: Vec<_> = tl.entries().iter().map(|e| e.delta.timestamp).collect();
        let mut sorted = stamps.clone();
        sorted.sort_unstable();
        prop_assert_eq!(stamps, sorted);

        // History stays scrubbable after out-of-order arrival.
        tl.set_viewing_timestamp(ViewingTimestamp::At(0));
        prop_assert_eq!(tl.text(), contents);
        tl.set_viewing_timestamp(ViewingTimestamp::Latest);
        prop_assert_eq!(tl.text(), expected);
    }
}

#[test]
fn late_line_insert_shifts_under_later_rewrite() {
    let contents = "a\nb\nc";
    let early = Delta::edit(10, vec![Change::at(Point::new(0, 0), "", "X\n")]);
    let late = Delta::edit(20, vec![Change::at(Point::new(2, 0), "b", "B")]);

    let in_order = arrived(contents, vec![early.clone(), late.clone()]);
    assert_eq!(in_order.text(), "X\na\nB\nc");

    let mut reversed = arrived(contents, vec![late, early]);
    assert_eq!(reversed.text(), "X\na\nB\nc");
    reversed.set_viewing_timestamp(ViewingTimestamp::At(15));
    assert_eq!(reversed.text(), "X\na\nb\nc");
    reversed.set_viewing_timestamp(ViewingTimestamp::At(0));
    assert_eq!(reversed.text(), contents);
}

#[test]
fn history_reads_leave_live_buffer_alone() {
    let edits = build_edits(
        "abc",
        &[EditOp {
            row: 0,
            column: 3,
            delete: 0,
            insert: "d".into(),
        }],
    );
    let tl = loaded("abc", &edits);
    let id = tl.entries()[1].id;
    assert_eq!(tl.text_before_delta(id).as_deref(), Some("abc"));
    assert_eq!(tl.text_after_delta(id).as_deref(), Some("abcd"));
    assert_eq!(tl.text(), "abcd");
}
