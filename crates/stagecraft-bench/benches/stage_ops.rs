//! Criterion micro-benchmarks for stage computation.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use stagecraft_bench::forward_loop;
use stagecraft_core::Interfaces;
use stagecraft_stage::{Connecting, Stage};
use stagecraft_test_utils::{push_seed, GapConnector};

/// Benchmark: 1K forward propagations through a self-fed stage.
fn bench_forward_loop_1k(c: &mut Criterion) {
    c.bench_function("forward_loop_1k", |b| {
        b.iter(|| {
            let (mut interfaces, mut stage) = forward_loop().unwrap();
            for _ in 0..1_000 {
                stage.compute(&mut interfaces).unwrap();
            }
            black_box(stage.core().segments().len())
        });
    });
}

/// Benchmark: full 50x50 connecting sweep.
fn bench_connecting_sweep_50x50(c: &mut Criterion) {
    c.bench_function("connecting_sweep_50x50", |b| {
        b.iter(|| {
            let mut interfaces: Interfaces<i64> = Interfaces::new();
            let mut stage = Connecting::new("bridge", GapConnector::new(10), &mut interfaces);
            let input = stage.core().input().unwrap();
            let output = stage.core().output().unwrap();
            for v in 0..50 {
                push_seed(&mut interfaces, input, v);
                push_seed(&mut interfaces, output, v + 5);
            }
            while stage.can_compute(&interfaces) {
                stage.compute(&mut interfaces).unwrap();
            }
            black_box(stage.core().solutions().count())
        });
    });
}

criterion_group!(benches, bench_forward_loop_1k, bench_connecting_sweep_50x50);
criterion_main!(benches);
