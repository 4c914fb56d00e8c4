//! Benchmarks for the schedulers.
//!
//! Benchmarks cover:
//! - Immediate one-shot scheduling
//! - Trampolined recursive chains of increasing length
//! - Pool round-trips (submit, run on a worker, signal back)
//! - Token linking and cascading cancellation

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use rx_schedulers::builders::build_pool;
use rx_schedulers::config::WorkerPoolConfig;
use rx_schedulers::core::{Continuation, Scheduler, Subscription};
use rx_schedulers::util::CountDownLatch;

// ============================================================================
// Helpers
// ============================================================================

fn counting_chain(limit: u64) -> Continuation<u64> {
    Continuation::new(move |scheduler: &Scheduler, i: u64, this: &Continuation<u64>| {
        if i >= limit {
            return Ok(Subscription::empty());
        }
        Ok(scheduler.schedule_with(i + 1, this.clone())?)
    })
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_immediate_schedule(c: &mut Criterion) {
    let scheduler = Scheduler::immediate();
    c.bench_function("immediate_schedule", |b| {
        b.iter(|| {
            let token = scheduler
                .schedule(|| Ok(Subscription::empty()))
                .expect("schedule");
            black_box(token)
        });
    });
}

fn bench_trampoline_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("trampoline_chain");
    let scheduler = Scheduler::current_thread();

    for length in [42_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(length));
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            b.iter(|| {
                let token = scheduler
                    .schedule_with(0, counting_chain(length))
                    .expect("schedule");
                black_box(token)
            });
        });
    }
    group.finish();
}

fn bench_pool_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_round_trip");
    group.measurement_time(Duration::from_secs(5));

    let pool = build_pool(
        &WorkerPoolConfig::computation()
            .with_thread_name_prefix("BenchComputation")
            .with_max_workers(4),
    )
    .expect("pool");
    let scheduler = pool.scheduler();

    for batch in [1_u64, 64] {
        group.throughput(Throughput::Elements(batch));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            b.iter(|| {
                let done = Arc::new(CountDownLatch::new(batch as usize));
                for _ in 0..batch {
                    let done = Arc::clone(&done);
                    scheduler
                        .schedule(move || {
                            done.count_down();
                            Ok(Subscription::empty())
                        })
                        .expect("schedule");
                }
                done.wait();
            });
        });
    }
    group.finish();
    pool.shutdown();
}

fn bench_cancel_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel_cascade");

    for depth in [10_usize, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let head = Subscription::new();
                let mut tail = head.clone();
                for _ in 0..depth {
                    let next = Subscription::new();
                    tail.add(next.clone());
                    tail = next;
                }
                black_box(head.cancel())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_immediate_schedule,
    bench_trampoline_chain,
    bench_pool_round_trip,
    bench_cancel_cascade
);
criterion_main!(benches);
