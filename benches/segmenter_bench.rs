//! Бенчмарки разбиения текста и расчета размещения.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use dub_sync::align::{Segment, TimingAligner};
use dub_sync::text::TextSegmenter;

fn prose(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Sentence number {} talks about dubbing, timing and speech.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn unpunctuated(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", i % 97))
        .collect::<Vec<_>>()
        .join(" ")
}

fn bench_split(c: &mut Criterion) {
    let segmenter = TextSegmenter::new(250);
    let mut group = c.benchmark_group("split");
    for size in [10usize, 100, 1_000] {
        let text = prose(size);
        group.bench_with_input(BenchmarkId::new("sentences", size), &text, |b, text| {
            b.iter(|| segmenter.split(black_box(text)))
        });
        let text = unpunctuated(size * 8);
        group.bench_with_input(BenchmarkId::new("unpunctuated", size), &text, |b, text| {
            b.iter(|| segmenter.split(black_box(text)))
        });
    }
    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let aligner = TimingAligner::default();
    let segments: Vec<Segment> = (0..500u64)
        .filter_map(|i| Segment::new(i as usize, i * 2_000, i * 2_000 + 1_500, "").ok())
        .collect();

    c.bench_function("plan_500_segments", |b| {
        b.iter(|| {
            segments
                .iter()
                .map(|s| aligner.plan(s, black_box(1_800)).offset_ms)
                .sum::<u64>()
        })
    });
}

criterion_group!(benches, bench_split, bench_plan);
criterion_main!(benches);
