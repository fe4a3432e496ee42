//! # Segue Performance Benchmarks
//!
//! Benchmarks for the hot paths of playlist sequencing.
//!
//! ## Benchmark Categories
//!
//! - **Scoring**: Single transitions and full compatibility matrices
//! - **Search**: Graph construction and bounded A* search
//! - **Fallback**: Greedy nearest-neighbour sequencing
//! - **Optimizer**: End-to-end requests, single and batched, plus a
//!   300-track pool with era, language and subgenre data
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench scoring
//! cargo bench search
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segue::compatibility::score_pair;
use segue::constraints::SequenceContext;
use segue::cost::CostModel;
use segue::fallback::greedy_sequence;
use segue::graph::PlaylistGraph;
use segue::search::{search, SearchParams};
use segue::{
    CompatibilityMatrix, ConstraintSet, MetadataEnrichment, OptimizerConfig, PlaylistOptimizer, PlaylistRequest,
    ScoringContext, Track,
};
use std::hint::black_box;

const KEYS: [&str; 12] = ["1A", "2A", "3A", "4A", "5A", "6A", "7A", "8A", "9A", "10B", "11B", "12B"];
const LANGUAGES: [&str; 3] = ["english", "Spanish", "español"];
const SUBGENRES: [&str; 4] = ["deep house", "tech house", "disco", "nu-disco"];

/// Seeded pool of fully attributed tracks
fn create_test_tracks(count: usize) -> Vec<Track> {
    let mut rng = StdRng::seed_from_u64(0x5e9e);
    (0..count)
        .map(|i| {
            Track::new(format!("track{i:04}"))
                .with_title(format!("Track {i:04}"))
                .with_artist(format!("Artist {}", i / 8))
                .with_key(KEYS[rng.gen_range(0..KEYS.len())])
                .with_bpm(rng.gen_range(100.0..140.0))
                .with_energy(rng.gen_range(1.0..10.0))
                .with_emotional_intensity(rng.gen_range(1.0..10.0))
                .with_enrichment("era", format!("{}s", 1970 + 10 * (i % 5)))
        })
        .collect()
}

/// Seeded pool carrying language and subgenre on top of era
fn create_enriched_tracks(count: usize) -> Vec<Track> {
    create_test_tracks(count)
        .into_iter()
        .enumerate()
        .map(|(i, track)| {
            track
                .with_enrichment("language", LANGUAGES[i % LANGUAGES.len()])
                .with_enrichment("subgenre", SUBGENRES[i % SUBGENRES.len()])
        })
        .collect()
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let tracks = create_test_tracks(2);
    let context = ScoringContext::default();

    group.bench_function("score_pair", |b| {
        b.iter(|| score_pair(black_box(&tracks[0]), black_box(&tracks[1]), &context, &MetadataEnrichment))
    });

    for size in [25, 100, 250] {
        let pool = create_test_tracks(size);
        group.bench_with_input(BenchmarkId::new("matrix_build", size), &pool, |b, pool| {
            b.iter(|| CompatibilityMatrix::build(black_box(pool), &context, &MetadataEnrichment))
        });
    }

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let config = OptimizerConfig::default();
    let context = ScoringContext::default();

    for (size, length) in [(20, 8), (50, 12), (100, 20)] {
        let pool = create_test_tracks(size);
        let matrix = CompatibilityMatrix::build(&pool, &context, &MetadataEnrichment);
        let constraints = ConstraintSet::from_config(&config);
        let cost = CostModel::new(SequenceContext::new(&pool, &matrix), length, &config);
        let graph = PlaylistGraph::build(&matrix, length, Some(0));

        group.bench_function(BenchmarkId::new("graph_build", format!("{size}x{length}")), |b| {
            b.iter(|| PlaylistGraph::build(black_box(&matrix), length, Some(0)))
        });
        group.bench_function(BenchmarkId::new("astar", format!("{size}x{length}")), |b| {
            b.iter(|| search(black_box(&graph), &cost, &constraints, SearchParams::from(&config)))
        });
    }

    group.finish();
}

fn benchmark_fallback(c: &mut Criterion) {
    let mut group = c.benchmark_group("fallback");
    let context = ScoringContext::default();

    for size in [50, 250, 1000] {
        let pool = create_test_tracks(size);
        let matrix = CompatibilityMatrix::build(&pool, &context, &MetadataEnrichment);
        group.bench_with_input(BenchmarkId::new("greedy", size), &matrix, |b, matrix| {
            b.iter(|| greedy_sequence(black_box(matrix), 30, None))
        });
    }

    group.finish();
}

fn benchmark_optimizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer");
    group.sample_size(20);
    let optimizer = PlaylistOptimizer::default();

    for size in [20, 60] {
        let request = PlaylistRequest::new(create_test_tracks(size), 10).with_alternatives(2);
        group.bench_with_input(BenchmarkId::new("optimize", size), &request, |b, request| {
            b.iter(|| optimizer.optimize(black_box(request)))
        });
    }

    let requests: Vec<PlaylistRequest> = (0..8)
        .map(|i| PlaylistRequest::new(create_test_tracks(30), 10).with_start(format!("track{i:04}")))
        .collect();
    group.bench_function("optimize_batch_8", |b| b.iter(|| optimizer.optimize_batch(black_box(&requests))));

    group.finish();

    // Full default node budget over an enriched pool
    let mut group = c.benchmark_group("optimizer_enriched");
    group.sample_size(10);
    let request = PlaylistRequest::new(create_enriched_tracks(300), 30);
    group.bench_with_input(BenchmarkId::new("optimize", 300), &request, |b, request| {
        b.iter(|| optimizer.optimize(black_box(request)))
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_scoring,
    benchmark_search,
    benchmark_fallback,
    benchmark_optimizer
);
criterion_main!(benches);
