//! Benchmarks for the incremental sparse-matrix builder
//!
//! Run with: cargo bench --package data-loader

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use data_loader::{IncrementalSparseMatrix, NewTokenPolicy, TokenMapper};

const USERS: usize = 5_000;
const ITEMS: usize = 2_000;
const ENTRIES: usize = 200_000;

fn triples() -> (Vec<String>, Vec<String>, Vec<f64>) {
    let rows = (0..ENTRIES).map(|i| format!("u{}", (i * 7) % USERS)).collect();
    let cols = (0..ENTRIES).map(|i| format!("i{}", (i * 13) % ITEMS)).collect();
    let values = vec![1.0; ENTRIES];
    (rows, cols, values)
}

fn bench_build_with_add(c: &mut Criterion) {
    let (rows, cols, values) = triples();

    c.bench_function("builder_add_tokens", |b| {
        b.iter(|| {
            let mut builder = IncrementalSparseMatrix::new();
            builder
                .add_entries(black_box(&rows), black_box(&cols), black_box(&values))
                .unwrap();
            black_box(builder.finalize())
        })
    });
}

fn bench_build_with_filter(c: &mut Criterion) {
    let (rows, cols, values) = triples();
    // Only half of the users are known, the rest is dropped
    let users = TokenMapper::from_tokens((0..USERS / 2).map(|u| format!("u{}", u)));

    c.bench_function("builder_ignore_unknown_rows", |b| {
        b.iter(|| {
            let mut builder = IncrementalSparseMatrix::new()
                .with_row_mapper(users.clone(), NewTokenPolicy::Ignore);
            builder
                .add_entries(black_box(&rows), black_box(&cols), black_box(&values))
                .unwrap();
            black_box(builder.finalize())
        })
    });
}

criterion_group!(benches, bench_build_with_add, bench_build_with_filter);
criterion_main!(benches);
