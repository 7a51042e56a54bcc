//! Benchmarks for queue operations using criterion.
//!
//! These benchmarks measure:
//! - Single enqueue → checkout → complete cycle latency
//! - Ramp evaluation cost
//! - Drain throughput across worker pool sizes

#![allow(missing_docs)]

use std::time::Duration;

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion,
    Throughput,
};
use surge::{FailurePolicy, QueueConfig, TimeRamp, WorkQueue};
use surge_testkit::{shared_log, wait_for_drain, RecordingItem};
use tokio::runtime::Runtime;

/// Creates a tokio runtime for async benchmarks.
fn create_runtime() -> Runtime {
    Runtime::new().expect("Failed to create tokio runtime")
}

/// Benchmark: one full enqueue → checkout → complete cycle, manually
/// driven with no workers attached.
fn bench_enqueue_checkout_cycle(c: &mut Criterion) {
    let rt = create_runtime();

    let mut group = c.benchmark_group("enqueue_checkout_cycle");
    group.sample_size(100);

    group.bench_function("manual", |b| {
        let queue = WorkQueue::new(QueueConfig::new(1024, 1)).unwrap();
        let log = shared_log();

        b.to_async(&rt).iter(|| {
            let queue = queue.clone();
            let log = log.clone();
            async move {
                let accepted =
                    queue.try_enqueue(RecordingItem::new("bench", &log));
                assert!(accepted);
                let item = queue.next_item().await.expect("queue is live");
                queue.item_completed(&item).expect("item was checked out");
            }
        });
    });

    group.finish();
}

/// Benchmark: evaluating the ramp at various points in its period.
fn bench_ramp_value_at(c: &mut Criterion) {
    let ramp = TimeRamp::new(1, 100, Duration::from_secs(60)).unwrap();

    let mut group = c.benchmark_group("ramp_value_at");
    group.sample_size(100);

    for elapsed_ms in [0u64, 15_000, 30_000, 90_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(elapsed_ms),
            &elapsed_ms,
            |b, &ms| {
                let elapsed = Duration::from_millis(ms);
                b.iter(|| black_box(ramp.value_at(black_box(elapsed))));
            },
        );
    }

    group.finish();
}

/// Benchmark: draining 100 items through live worker pools of varying
/// sizes.
fn bench_drain_throughput(c: &mut Criterion) {
    let rt = create_runtime();
    let worker_counts = vec![1, 4, 8];

    let mut group = c.benchmark_group("drain_throughput");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(15));

    for worker_count in &worker_counts {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(
            BenchmarkId::new("workers", worker_count),
            worker_count,
            |b, &workers| {
                b.to_async(&rt).iter(|| async move {
                    let queue = WorkQueue::new(
                        QueueConfig::new(128, workers)
                            .with_failure_policy(FailurePolicy::SkipAndLog)
                            .with_idle_recheck(5),
                    )
                    .unwrap();
                    queue.spawn_workers().await;

                    let log = shared_log();
                    for i in 0..100 {
                        assert!(queue.try_enqueue(RecordingItem::new(
                            format!("item-{i}"),
                            &log
                        )));
                    }

                    wait_for_drain(
                        &queue,
                        Duration::from_millis(1),
                        Duration::from_secs(10),
                    )
                    .await
                    .expect("drain timed out");

                    queue.shutdown().await;
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_enqueue_checkout_cycle,
    bench_ramp_value_at,
    bench_drain_throughput
);
criterion_main!(benches);
