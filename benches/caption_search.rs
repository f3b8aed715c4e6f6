use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use lectern::captions::CaptionIndex;

/// A lecture-length transcript with a cue every 2.5 seconds
fn build_index(cues: i64) -> CaptionIndex {
    let start: Vec<i64> = (0..cues).map(|i| i * 2500).collect();
    let texts: Vec<String> = (0..cues).map(|i| format!("cue number {}", i)).collect();
    CaptionIndex::new(start, texts).unwrap()
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("Caption Search");

    for cues in [100, 1_000, 10_000] {
        let index = build_index(cues);
        let span = cues * 2500;

        group.bench_with_input(BenchmarkId::new("search", cues), &index, |b, index| {
            let mut t = 0;
            b.iter(|| {
                t = (t + 7_919) % span;
                black_box(index.search(black_box(t)));
            })
        });

        group.bench_with_input(BenchmarkId::new("search_within", cues), &index, |b, index| {
            let mut t = 0;
            b.iter(|| {
                t = (t + 7_919) % span;
                black_box(index.search_within(black_box(t), span / 4, Some(span / 2)));
            })
        });
    }

    group.finish();
}

fn benchmark_bounded(c: &mut Criterion) {
    let index = build_index(10_000);
    c.bench_function("Bounded copy (10k cues)", |b| {
        b.iter(|| black_box(index.bounded(black_box(600_000), Some(1_200_000))))
    });
}

criterion_group!(benches, benchmark_search, benchmark_bounded);
criterion_main!(benches);
