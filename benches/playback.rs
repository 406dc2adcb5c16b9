//! Playback Engine Benchmarks
//!
//! Measures tokenization throughput and how fast the engine can consume
//! a whole book, which bounds the per-tick cost of a live session.
//!
//! Run with: `cargo bench --bench playback`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use flash_reader::ingest::{normalize_text, WordSequence};
use flash_reader::playback::{PlaybackConfig, PlaybackEngine, PlaybackMode};

/// Build a text with roughly `words` words, split into paragraphs
fn sample_text(words: usize) -> String {
    let sentence = "The quick brown fox jumps over the lazy dog near the river bank today. ";
    let per_sentence = 13;
    let mut text = String::with_capacity(words * 6);
    for i in 0..(words / per_sentence + 1) {
        text.push_str(sentence);
        if i % 5 == 4 {
            text.push_str("\n\n");
        }
    }
    text
}

fn bench_tokenize(c: &mut Criterion) {
    let text = sample_text(10_000);

    let mut group = c.benchmark_group("tokenize");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("normalize_10k_words", |b| {
        b.iter(|| black_box(normalize_text(black_box(&text))))
    });

    group.bench_function("word_sequence_10k_words", |b| {
        b.iter(|| black_box(WordSequence::new(black_box(&text))))
    });

    group.finish();
}

fn bench_engine_ticks(c: &mut Criterion) {
    let words = WordSequence::shared(&sample_text(10_000));

    let mut group = c.benchmark_group("engine_ticks");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("consume_book_single", |b| {
        b.iter(|| {
            let config = PlaybackConfig::new(600, 1, PlaybackMode::Single);
            let mut engine = PlaybackEngine::new(words.clone(), config, 0);
            engine.start(None).unwrap();
            while let Some(frame) = engine.tick() {
                black_box(frame);
            }
        })
    });

    group.bench_function("consume_book_phrase_5", |b| {
        b.iter(|| {
            let config = PlaybackConfig::new(600, 5, PlaybackMode::Phrase);
            let mut engine = PlaybackEngine::new(words.clone(), config, 0);
            engine.start(None).unwrap();
            while let Some(frame) = engine.tick() {
                black_box(frame);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_engine_ticks);
criterion_main!(benches);
