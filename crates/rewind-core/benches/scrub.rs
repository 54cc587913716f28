//! Scrubbing benchmarks.
//!
//! Builds one document with a long edit history and measures moving the
//! viewing timestamp across it, plus historical materialization.
//!
//! Run with:
//! ```sh
//! cargo bench --bench scrub
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rewind_core::buffer::{Point, ScratchBuffer};
use rewind_core::delta::{Change, Delta};
use rewind_core::model::{DocumentId, Timestamp, ViewingTimestamp};
use rewind_core::timeline::{DocumentTimeline, InsertMode};

const SIZES: [usize; 3] = [100, 1_000, 5_000];

/// One line per 20 edits; each edit appends a word to the current line.
fn build(edits: usize) -> DocumentTimeline {
    let mut tl = DocumentTimeline::new(DocumentId::new("bench"), Box::new(ScratchBuffer::new()));
    tl.insert(Delta::open(0, "bench.txt", "text", ""), InsertMode::Apply);

    let mut row = 0u32;
    let mut column = 0u32;
    for i in 0..edits {
        let ts = Timestamp::try_from(i + 1).unwrap_or(Timestamp::MAX);
        let text = if i % 20 == 19 { "word\n" } else { "word " };
        tl.insert(
            Delta::edit(ts, vec![Change::at(Point::new(row, column), "", text)]),
            InsertMode::Apply,
        );
        if text.ends_with('\n') {
            row += 1;
            column = 0;
        } else {
            column += 5;
        }
    }
    tl
}

fn bench_scrub_full_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("scrub.full_range");

    for size in SIZES {
        let mut tl = build(size);
        group.throughput(Throughput::Elements(size as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                tl.set_viewing_timestamp(ViewingTimestamp::At(0));
                tl.set_viewing_timestamp(ViewingTimestamp::Latest);
                black_box(tl.replay_pointer())
            });
        });
    }

    group.finish();
}

fn bench_scrub_midpoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("scrub.midpoint");

    for size in SIZES {
        let mut tl = build(size);
        let mid = Timestamp::try_from(size / 2).unwrap_or(Timestamp::MAX);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                tl.set_viewing_timestamp(ViewingTimestamp::At(mid));
                tl.set_viewing_timestamp(ViewingTimestamp::Latest);
                black_box(tl.stats())
            });
        });
    }

    group.finish();
}

fn bench_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize_at");

    for size in SIZES {
        let tl = build(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, size| {
            b.iter(|| black_box(tl.materialize_at(Some(size / 2)).len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scrub_full_range,
    bench_scrub_midpoint,
    bench_materialize
);
criterion_main!(benches);
