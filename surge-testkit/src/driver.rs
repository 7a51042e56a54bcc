use std::sync::Arc;
use std::time::{Duration, Instant};

use surge::{QueueStats, SharedWorkItem, WorkQueue};

/// Offer an item to the queue, sleeping and retrying while it is full.
///
/// The producer half of the backpressure contract: `try_enqueue` returning
/// `false` is a signal to slow down, not an error.
pub async fn enqueue_with_backoff(
    queue: &WorkQueue,
    item: SharedWorkItem,
    backoff: Duration,
) {
    while !queue.try_enqueue(Arc::clone(&item)) {
        tokio::time::sleep(backoff).await;
    }
}

/// Poll a queue's stats until every accepted item has completed.
///
/// Mirrors how a migration driver watches for phase completion. Returns the
/// final snapshot, or an error if `deadline` passes first.
pub async fn wait_for_drain(
    queue: &WorkQueue,
    poll: Duration,
    deadline: Duration,
) -> anyhow::Result<QueueStats> {
    let started = Instant::now();
    loop {
        let stats = queue.stats();
        if stats.is_drained() {
            return Ok(stats);
        }
        if started.elapsed() > deadline {
            anyhow::bail!(
                "queue not drained after {:?}: {} pending, {} in progress",
                deadline,
                stats.pending_count,
                stats.in_progress_count
            );
        }
        tokio::time::sleep(poll).await;
    }
}
