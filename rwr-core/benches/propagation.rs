use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use rwr_core::reactive::{create_effect, create_memo, create_root, Signal};

fn signal_read_benchmark(c: &mut Criterion) {
    let signal = Signal::new(42);

    c.bench_function("signal_read", |b| {
        b.iter(|| {
            black_box(signal.get());
        });
    });
}

fn fan_out_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");

    for width in [1usize, 16, 256] {
        let signal = Signal::new(0usize);
        let _dispose = create_root(|dispose| {
            for _ in 0..width {
                let source = signal.clone();
                create_effect(move || {
                    black_box(source.get());
                });
            }
            dispose
        });

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            let mut i = 0;
            b.iter(|| {
                i += 1;
                signal.set(black_box(i));
            });
        });
    }

    group.finish();
}

fn memo_chain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_chain");

    for depth in [1usize, 8, 64] {
        let signal = Signal::new(0u64);
        let _dispose = create_root(|dispose| {
            let source = signal.clone();
            let mut tail = create_memo(move || source.get());
            for _ in 1..depth {
                let prev = tail.clone();
                tail = create_memo(move || prev.get() + 1);
            }
            create_effect(move || {
                black_box(tail.get());
            });
            dispose
        });

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            let mut i = 0;
            b.iter(|| {
                i += 1;
                signal.set(black_box(i));
            });
        });
    }

    group.finish();
}

fn rerun_with_children_benchmark(c: &mut Criterion) {
    let signal = Signal::new(0u32);
    let source = signal.clone();
    let _dispose = create_root(move |dispose| {
        create_effect(move || {
            source.get();
            for _ in 0..8 {
                create_effect(|| {});
            }
        });
        dispose
    });

    c.bench_function("rerun_with_children", |b| {
        let mut i = 0;
        b.iter(|| {
            i += 1;
            signal.set(black_box(i));
        });
    });
}

criterion_group!(
    benches,
    signal_read_benchmark,
    fan_out_benchmark,
    memo_chain_benchmark,
    rerun_with_children_benchmark
);
criterion_main!(benches);
