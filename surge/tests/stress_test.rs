//! Stress tests for the surge work queue.
//!
//! High-throughput scenarios: 1000 items across 10 workers, with and
//! without a ramp, under a hard timeout.

use std::time::Duration;

use surge::{FailurePolicy, QueueConfig, TimeRamp, WorkQueue};
use surge_testkit::{
    enqueue_with_backoff, shared_log, wait_for_drain, RecordingItem,
    SleepItem,
};

const POLL: Duration = Duration::from_millis(20);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_thousand_items_ten_workers() {
    let queue = WorkQueue::new(
        QueueConfig::new(100, 10)
            .with_failure_policy(FailurePolicy::SkipAndLog)
            .with_idle_recheck(10),
    )
    .unwrap();
    queue.spawn_workers().await;

    let log = shared_log();
    for i in 0..1000 {
        enqueue_with_backoff(
            &queue,
            RecordingItem::new(format!("item-{i}"), &log),
            Duration::from_millis(2),
        )
        .await;
    }

    let stats = wait_for_drain(&queue, POLL, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(stats.completed_count, 1000);
    assert_eq!(log.lock().len(), 1000);

    queue.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ramped_run_drains_completely() {
    let config = QueueConfig::new(64, 8)
        .with_failure_policy(FailurePolicy::SkipAndLog)
        .with_idle_recheck(10);
    let ramp = TimeRamp::new(1, 8, Duration::from_millis(300)).unwrap();
    let queue = WorkQueue::with_ramp(config, ramp).unwrap();
    queue.spawn_workers().await;

    let log = shared_log();
    for i in 0..200 {
        enqueue_with_backoff(
            &queue,
            SleepItem::new(format!("item-{i}"), 1, &log),
            Duration::from_millis(2),
        )
        .await;
    }

    let stats = wait_for_drain(&queue, POLL, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(stats.completed_count, 200);
    assert_eq!(log.lock().len(), 200);

    queue.shutdown().await;
}
