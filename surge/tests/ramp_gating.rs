//! Tests for ramp-gated admission: the number of concurrently executing
//! items must track the ramp value, not just the worker pool size.
//!
//! Gated items block until released, so `in_progress` can only grow during
//! an observation window; the ramp is non-decreasing, so sampling the ramp
//! after sampling the stats never under-reports the allowed limit.

use std::time::Duration;

use surge::{FailurePolicy, QueueConfig, TimeRamp, WorkQueue};
use surge_testkit::{wait_for_drain, Gate};
use tokio::time::timeout;

const POLL: Duration = Duration::from_millis(20);
const DEADLINE: Duration = Duration::from_secs(15);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ramp_admits_one_worker_then_opens_the_pool() {
    let config = QueueConfig::new(10, 5)
        .with_failure_policy(FailurePolicy::SkipAndLog)
        .with_idle_recheck(25);
    // Limit stays below 2 until roughly 860ms in (2s * ln2 / ln5).
    let ramp = TimeRamp::new(1, 5, Duration::from_secs(2)).unwrap();
    let queue = WorkQueue::with_ramp(config, ramp).unwrap();
    queue.spawn_workers().await;

    let gate = Gate::new();
    for i in 0..5 {
        assert!(queue.try_enqueue(gate.item(format!("held-{i}"))));
    }

    // Exactly one item is admitted early in the ramp.
    timeout(Duration::from_secs(5), async {
        while gate.started() < 1 {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("first item never started");

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(gate.started(), 1, "ramp admitted more than one item early");
    assert_eq!(queue.stats().in_progress_count, 1);

    // Once the period has elapsed, the full pool is admitted.
    timeout(Duration::from_secs(10), async {
        while gate.started() < 5 {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("pool never ramped up to five active items");
    assert_eq!(queue.stats().in_progress_count, 5);

    gate.open();
    let stats = wait_for_drain(&queue, POLL, DEADLINE).await.unwrap();
    assert_eq!(stats.completed_count, 5);

    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_progress_never_exceeds_ramp_value() {
    let config = QueueConfig::new(16, 6)
        .with_failure_policy(FailurePolicy::SkipAndLog)
        .with_idle_recheck(20);
    let ramp = TimeRamp::new(1, 6, Duration::from_millis(600)).unwrap();
    // The clone shares the original's start time, giving the test an
    // independent view of the limit the queue is enforcing.
    let observer = ramp.clone();
    let queue = WorkQueue::with_ramp(config, ramp).unwrap();
    queue.spawn_workers().await;

    let gate = Gate::new();
    for i in 0..10 {
        assert!(queue.try_enqueue(gate.item(format!("held-{i}"))));
    }

    for _ in 0..45 {
        let in_progress = queue.stats().in_progress_count;
        let allowed = observer.current_value();
        assert!(
            in_progress <= allowed,
            "{in_progress} items active with only {allowed} allowed"
        );
        tokio::time::sleep(POLL).await;
    }

    gate.open();
    let stats = wait_for_drain(&queue, POLL, DEADLINE).await.unwrap();
    assert_eq!(stats.completed_count, 10);

    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_pool_active_without_ramp() {
    let queue = WorkQueue::new(
        QueueConfig::new(8, 3)
            .with_failure_policy(FailurePolicy::SkipAndLog)
            .with_idle_recheck(10),
    )
    .unwrap();
    queue.spawn_workers().await;

    let gate = Gate::new();
    for i in 0..3 {
        assert!(queue.try_enqueue(gate.item(format!("held-{i}"))));
    }

    timeout(Duration::from_secs(5), async {
        while gate.started() < 3 {
            tokio::time::sleep(POLL).await;
        }
    })
    .await
    .expect("pool never reached full concurrency");

    gate.open();
    let stats = wait_for_drain(&queue, POLL, DEADLINE).await.unwrap();
    assert_eq!(stats.completed_count, 3);

    queue.shutdown().await;
}
