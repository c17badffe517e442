// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for segment extraction and prompt building.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tutor::extract::{extract_first_segment, SegmentExtractor};
use tutor::prompt::{build_continuation_prompt, build_initial_prompt};
use tutor::types::{LessonRequest, SessionContext};

/// Benchmark extraction over replies of growing length.
fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract/first_segment");

    let opening = "Namaste Asha! Today we explore photosynthesis. ";
    let filler = "Plants make their own food using sunlight, water and air. ";

    for repeats in [1usize, 10, 100] {
        let with_question = format!(
            "{}{}Can you tell me what leaves need to make food? Then we continue.",
            opening,
            filler.repeat(repeats)
        );
        group.throughput(Throughput::Bytes(with_question.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("question", repeats),
            &with_question,
            |b, text| b.iter(|| extract_first_segment(black_box(text))),
        );

        let without_question = format!("{}{}", opening, filler.repeat(repeats));
        group.bench_with_input(
            BenchmarkId::new("no_question", repeats),
            &without_question,
            |b, text| b.iter(|| extract_first_segment(black_box(text))),
        );
    }

    group.finish();
}

/// Benchmark the keyword question test on its own.
fn bench_interrogative_phrases(c: &mut Criterion) {
    let extractor = SegmentExtractor::default();
    let samples = [
        "Kya aap bata sakte hain ki patte hare kyun hote hain.",
        "Tell me which part of the plant absorbs water.",
        "Let us recall the three states of matter.",
    ];

    c.bench_function("extract/keyword_questions", |b| {
        b.iter(|| {
            for sample in &samples {
                black_box(extractor.extract(black_box(sample)));
            }
        })
    });
}

fn context() -> SessionContext {
    let request = LessonRequest::new("Science", "Photosynthesis", "Asha")
        .with_requirements("Use examples from the kitchen garden");
    SessionContext::from_request(&request)
}

/// Benchmark prompt construction.
fn bench_prompts(c: &mut Criterion) {
    let mut group = c.benchmark_group("prompt");
    let context = context();

    group.bench_function("initial", |b| {
        b.iter(|| build_initial_prompt(black_box(&context)))
    });

    for len in [4usize, 50, 500] {
        let history: Vec<String> = (0..len)
            .map(|i| {
                if i % 2 == 0 {
                    format!("Teacher: Segment {} with a question?", i)
                } else {
                    format!("Student: Answer number {}", i)
                }
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("continuation", len), &history, |b, history| {
            b.iter(|| build_continuation_prompt(black_box(&context), black_box(history)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract, bench_interrogative_phrases, bench_prompts);
criterion_main!(benches);
