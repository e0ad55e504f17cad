//! # Incorporation Benchmarks
//!
//! Performance benchmarks for contiguity-core learning and traversal.
//!
//! Run with: `cargo bench -p contiguity-core`

use contiguity_core::{ActionId, ContiguityTree, Encorporator, LabelGenerator};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::collections::BTreeSet;
use std::hint::black_box;

fn forward(size: u64) -> Vec<ActionId> {
    (0..size).map(ActionId).collect()
}

/// Pairs swapped: 1,0,3,2,...
fn pair_swapped(size: u64) -> Vec<ActionId> {
    (0..size).map(|i| ActionId(i ^ 1)).filter(|a| a.0 < size).collect()
}

fn learned(size: u64) -> (ContiguityTree, LabelGenerator) {
    let mut tree = ContiguityTree::new();
    let mut labels = LabelGenerator::new();
    Encorporator::incorporate(&mut tree, &mut labels, &forward(size)).expect("incorporate");
    (tree, labels)
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_first_demonstration(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_demonstration");

    for size in [100u64, 1000, 5000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let demo = forward(size);
            b.iter(|| {
                let mut tree = ContiguityTree::new();
                let mut labels = LabelGenerator::new();
                Encorporator::incorporate(&mut tree, &mut labels, &demo).expect("incorporate");
                black_box(tree)
            });
        });
    }

    group.finish();
}

fn bench_restructure(c: &mut Criterion) {
    let mut group = c.benchmark_group("restructure");

    for size in [100u64, 1000].iter() {
        let (tree, labels) = learned(*size);
        let demo = pair_swapped(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(Encorporator::trial(&tree, &labels, &demo).expect("trial")));
        });
    }

    group.finish();
}

fn bench_unchanged(c: &mut Criterion) {
    let mut group = c.benchmark_group("unchanged");

    for size in [100u64, 1000].iter() {
        let (tree, labels) = learned(*size);
        let demo = forward(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(Encorporator::trial(&tree, &labels, &demo).expect("trial")));
        });
    }

    group.finish();
}

fn bench_next_actions(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_actions");

    for size in [100u64, 1000].iter() {
        let (tree, _) = learned(*size);
        let completed: BTreeSet<ActionId> = (0..size / 2).map(ActionId).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(tree.next_possible_tasks(&completed)));
        });
    }

    group.finish();
}

fn bench_accepts(c: &mut Criterion) {
    let (tree, _) = learned(200);
    let demo = forward(200);

    c.bench_function("accepts_200", |b| {
        b.iter(|| black_box(tree.accepts(&demo)));
    });
}

criterion_group!(
    benches,
    bench_first_demonstration,
    bench_restructure,
    bench_unchanged,
    bench_next_actions,
    bench_accepts,
);

criterion_main!(benches);
