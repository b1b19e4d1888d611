//! Benchmark comparison: ord-hashmap vs std HashMap vs hashbrown
//!
//! Single-threaded throughput for the common operations. The unordered maps
//! set the baseline cost; the gap shows what the insertion-order bookkeeping
//! (dense entry vec plus index bins) buys and costs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// Number of operations per benchmark
const SMALL_OPS: usize = 1_000;
const MEDIUM_OPS: usize = 10_000;
const LARGE_OPS: usize = 100_000;

/// Benchmark: insert operations
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for &size in &[SMALL_OPS, MEDIUM_OPS, LARGE_OPS] {
        group.throughput(Throughput::Elements(size as u64));

        // ord-hashmap
        group.bench_with_input(BenchmarkId::new("ord-hashmap", size), &size, |b, &size| {
            b.iter(|| {
                let mut map = ord_hashmap::OrdHashMap::new();
                for i in 0..size as u64 {
                    map.insert(black_box(i), black_box(i * 2)).unwrap();
                }
                map
            });
        });

        // std HashMap
        group.bench_with_input(BenchmarkId::new("std-hashmap", size), &size, |b, &size| {
            b.iter(|| {
                let mut map = std::collections::HashMap::new();
                for i in 0..size as u64 {
                    map.insert(black_box(i), black_box(i * 2));
                }
                map
            });
        });

        // hashbrown
        group.bench_with_input(BenchmarkId::new("hashbrown", size), &size, |b, &size| {
            b.iter(|| {
                let mut map = hashbrown::HashMap::new();
                for i in 0..size as u64 {
                    map.insert(black_box(i), black_box(i * 2));
                }
                map
            });
        });
    }

    group.finish();
}

/// Benchmark: get operations
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for &size in &[SMALL_OPS, MEDIUM_OPS, LARGE_OPS] {
        group.throughput(Throughput::Elements(size as u64));

        // ord-hashmap
        group.bench_with_input(BenchmarkId::new("ord-hashmap", size), &size, |b, &size| {
            let mut map = ord_hashmap::OrdHashMap::new();
            for i in 0..size as u64 {
                map.insert(i, i * 2).unwrap();
            }
            b.iter(|| {
                let mut sum = 0;
                for i in 0..size as u64 {
                    if let Some(v) = map.get(&black_box(i)) {
                        sum += *v;
                    }
                }
                sum
            });
        });

        // std HashMap
        group.bench_with_input(BenchmarkId::new("std-hashmap", size), &size, |b, &size| {
            let mut map = std::collections::HashMap::new();
            for i in 0..size as u64 {
                map.insert(i, i * 2);
            }
            b.iter(|| {
                let mut sum = 0;
                for i in 0..size as u64 {
                    if let Some(v) = map.get(&black_box(i)) {
                        sum += *v;
                    }
                }
                sum
            });
        });

        // hashbrown
        group.bench_with_input(BenchmarkId::new("hashbrown", size), &size, |b, &size| {
            let mut map = hashbrown::HashMap::new();
            for i in 0..size as u64 {
                map.insert(i, i * 2);
            }
            b.iter(|| {
                let mut sum = 0;
                for i in 0..size as u64 {
                    if let Some(v) = map.get(&black_box(i)) {
                        sum += *v;
                    }
                }
                sum
            });
        });
    }

    group.finish();
}

/// Benchmark: full iteration
///
/// The ordered map iterates a dense vec; the others walk their buckets.
fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");

    for &size in &[SMALL_OPS, MEDIUM_OPS, LARGE_OPS] {
        group.throughput(Throughput::Elements(size as u64));

        // ord-hashmap
        group.bench_with_input(BenchmarkId::new("ord-hashmap", size), &size, |b, &size| {
            let mut map = ord_hashmap::OrdHashMap::new();
            for i in 0..size as u64 {
                map.insert(i, i * 2).unwrap();
            }
            b.iter(|| {
                let mut sum = 0u64;
                for (_, v) in map.iter() {
                    sum = sum.wrapping_add(*v);
                }
                black_box(sum)
            });
        });

        // std HashMap
        group.bench_with_input(BenchmarkId::new("std-hashmap", size), &size, |b, &size| {
            let mut map = std::collections::HashMap::new();
            for i in 0..size as u64 {
                map.insert(i, i * 2);
            }
            b.iter(|| {
                let mut sum = 0u64;
                for (_, v) in map.iter() {
                    sum = sum.wrapping_add(*v);
                }
                black_box(sum)
            });
        });

        // hashbrown
        group.bench_with_input(BenchmarkId::new("hashbrown", size), &size, |b, &size| {
            let mut map = hashbrown::HashMap::new();
            for i in 0..size as u64 {
                map.insert(i, i * 2);
            }
            b.iter(|| {
                let mut sum = 0u64;
                for (_, v) in map.iter() {
                    sum = sum.wrapping_add(*v);
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_get, bench_iterate);
criterion_main!(benches);
