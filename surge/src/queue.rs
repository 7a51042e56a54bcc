use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Notify};

use crate::config::{FailurePolicy, QueueConfig};
use crate::events::{EventMeta, InProcEventBus, ItemEvent, ItemEventPayload};
use crate::item::{same_item, SharedWorkItem};
use crate::ramp::TimeRamp;
use crate::telemetry;
use crate::worker::ShutdownToken;

/// Point-in-time snapshot of queue progress counters.
///
/// Snapshots are not synchronized with later queue state; a driver polling
/// for drain should treat them as advisory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueStats {
    /// When the snapshot was taken.
    pub sampled_at: DateTime<Utc>,
    /// Items accepted but not yet checked out by a worker.
    pub pending_count: usize,
    /// Items currently executing on a worker.
    pub in_progress_count: usize,
    /// Items finished since construction or the last
    /// [`WorkQueue::reset`].
    pub completed_count: u64,
}

impl QueueStats {
    /// Items still owned by the queue in some form.
    pub fn non_completed_count(&self) -> usize {
        self.pending_count + self.in_progress_count
    }

    /// True once every accepted item has finished.
    pub fn is_drained(&self) -> bool {
        self.non_completed_count() == 0
    }
}

struct QueueState {
    pending: VecDeque<SharedWorkItem>,
    in_progress: Vec<SharedWorkItem>,
    completed_count: u64,
    ramp: Option<TimeRamp>,
}

impl QueueState {
    /// Concurrency allowed right now: the ramp value when a ramp is
    /// installed, otherwise the full worker pool.
    fn active_limit(&self, worker_count: usize) -> usize {
        self.ramp
            .as_ref()
            .map_or(worker_count, TimeRamp::current_value)
    }

    /// Whether one more worker may check out an item right now.
    fn may_activate(&self, worker_count: usize) -> bool {
        !self.pending.is_empty()
            && self.active_limit(worker_count) > self.in_progress.len()
    }
}

struct QueueInner {
    config: QueueConfig,
    state: Mutex<QueueState>,
    /// Nudges one parked worker to recheck admission.
    admit: Notify,
    events: InProcEventBus,
    shutdown: ShutdownToken,
    worker_handles: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

/// Bounded FIFO work queue with a dynamically ramped concurrency cap.
///
/// A driver feeds items in with [`WorkQueue::try_enqueue`], applying its own
/// backoff when the pending list is full. A pool of long-lived workers
/// (started by [`WorkQueue::spawn_workers`]) pulls items out one at a time;
/// how many may execute concurrently is capped by the installed
/// [`TimeRamp`], or by `worker_count` when no ramp is set. The driver polls
/// [`WorkQueue::stats`] to detect when a phase has drained, and may call
/// [`WorkQueue::reset`] between phases to install a fresh ramp.
///
/// A ramp may name a limit above the pool size; the pool is the effective
/// ceiling.
///
/// `WorkQueue` is a cheap clone-shared handle; every clone observes the
/// same queue.
#[derive(Clone)]
pub struct WorkQueue {
    inner: Arc<QueueInner>,
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("WorkQueue");
        debug.field("config", &self.inner.config);

        match self.inner.state.try_lock() {
            Some(state) => {
                debug
                    .field("pending", &state.pending.len())
                    .field("in_progress", &state.in_progress.len())
                    .field("completed", &state.completed_count);
            }
            None => {
                debug.field("state", &"<locked>");
            }
        }

        debug
            .field(
                "shutdown_cancelled",
                &self.inner.shutdown.is_cancelled(),
            )
            .finish_non_exhaustive()
    }
}

impl WorkQueue {
    /// Create a queue without starting any workers.
    ///
    /// Fails if the capacity bound or worker pool size is zero, or if a
    /// retry policy allows zero attempts.
    pub fn new(config: QueueConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(config.max_pending > 0, "max_pending must be positive");
        anyhow::ensure!(
            config.worker_count > 0,
            "worker_count must be positive"
        );
        if let FailurePolicy::Retry { max_attempts } = config.failure_policy {
            anyhow::ensure!(
                max_attempts > 0,
                "retry policy needs at least one attempt"
            );
        }

        Ok(Self {
            inner: Arc::new(QueueInner {
                config,
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    in_progress: Vec::new(),
                    completed_count: 0,
                    ramp: None,
                }),
                admit: Notify::new(),
                events: InProcEventBus::new(256),
                shutdown: ShutdownToken::new(),
                worker_handles: tokio::sync::Mutex::new(Vec::new()),
            }),
        })
    }

    /// Create a queue with a ramp installed from the start.
    pub fn with_ramp(
        config: QueueConfig,
        ramp: TimeRamp,
    ) -> anyhow::Result<Self> {
        let queue = Self::new(config)?;
        queue.inner.state.lock().ramp = Some(ramp);
        Ok(queue)
    }

    /// Spawn the configured worker pool against this queue.
    ///
    /// Must be called from within a Tokio runtime. Workers run until
    /// [`WorkQueue::shutdown`].
    pub async fn spawn_workers(&self) {
        let group = format!("surge-{}", std::process::id());
        let mut handles = self.inner.worker_handles.lock().await;
        for i in 0..self.inner.config.worker_count {
            let worker_id = format!("{group}-w{i}");
            let queue = self.clone();
            handles.push(tokio::spawn(async move {
                crate::worker::run_worker(worker_id, queue).await;
            }));
        }
    }

    /// Create the queue and start its workers in one call.
    pub async fn start(config: QueueConfig) -> anyhow::Result<Self> {
        let queue = Self::new(config)?;
        queue.spawn_workers().await;
        Ok(queue)
    }

    /// The configuration this queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Offer an item to the queue without blocking.
    ///
    /// Returns `false`, leaving the queue untouched, when the pending list
    /// is full. That is backpressure rather than an error: callers loop
    /// with their own sleep until capacity frees up. On acceptance the item
    /// belongs to the queue until a worker finishes it.
    pub fn try_enqueue(&self, item: SharedWorkItem) -> bool {
        let label = item.label();
        let (depth, nudge) = {
            let mut state = self.inner.state.lock();
            if state.pending.len() >= self.inner.config.max_pending {
                tracing::trace!(label = %label, "pending list full, item refused");
                return false;
            }
            state.pending.push_back(item);
            (
                state.pending.len(),
                state.may_activate(self.inner.config.worker_count),
            )
        };

        if nudge {
            self.inner.admit.notify_one();
        }
        telemetry::record_item_enqueued(&label, depth);
        self.inner.events.publish(ItemEvent {
            meta: EventMeta::new(label, None),
            payload: ItemEventPayload::Enqueued {
                pending_depth: depth,
            },
        });
        true
    }

    /// Wait for an item this caller is allowed to run.
    ///
    /// Suspends while the pending list is empty or the concurrency cap is
    /// reached, and returns `None` only once the queue is shutting down.
    /// The caller owns the returned item until it hands it back via
    /// [`WorkQueue::item_completed`].
    ///
    /// Waiters loop on the admission predicate; a wake is a hint, never a
    /// guarantee. Each parked wait is additionally bounded by
    /// `idle_recheck_ms`, so a ramp that rises with elapsed time admits
    /// parked workers without any external nudge.
    pub async fn next_item(&self) -> Option<SharedWorkItem> {
        let recheck =
            Duration::from_millis(self.inner.config.idle_recheck_ms);
        loop {
            if self.inner.shutdown.is_cancelled() {
                return None;
            }

            // Arm the waiter before the predicate check so a nudge landing
            // between the check and the await is not lost.
            let armed = self.inner.admit.notified();
            if let Some(item) = self.try_checkout() {
                return Some(item);
            }

            tokio::select! {
                _ = armed => {}
                _ = tokio::time::sleep(recheck) => {}
                _ = self.inner.shutdown.cancelled() => return None,
            }
        }
    }

    /// One admission attempt under the lock.
    ///
    /// The wake of a further worker happens here so ramp-up proceeds one
    /// worker at a time.
    fn try_checkout(&self) -> Option<SharedWorkItem> {
        let (item, more) = {
            let mut state = self.inner.state.lock();
            if !state.may_activate(self.inner.config.worker_count) {
                return None;
            }
            let item = state.pending.pop_front()?;
            state.in_progress.push(Arc::clone(&item));
            (item, state.may_activate(self.inner.config.worker_count))
        };

        if more {
            self.inner.admit.notify_one();
        }
        Some(item)
    }

    /// Hand a finished item back to the queue.
    ///
    /// Fails if the item is not currently checked out; that is a
    /// bookkeeping bug in the caller, not a recoverable state.
    pub fn item_completed(&self, item: &SharedWorkItem) -> anyhow::Result<()> {
        let nudge = {
            let mut state = self.inner.state.lock();
            let idx = state
                .in_progress
                .iter()
                .position(|held| same_item(held, item))
                .ok_or_else(|| {
                    anyhow::anyhow!("completed item is not checked out")
                })?;
            state.in_progress.swap_remove(idx);
            state.completed_count += 1;
            state.may_activate(self.inner.config.worker_count)
        };

        // Several workers can finish at once while others are parked, so
        // admission is rechecked here rather than left to this worker's
        // next next_item call alone.
        if nudge {
            self.inner.admit.notify_one();
        }
        Ok(())
    }

    /// Snapshot the progress counters.
    ///
    /// Also nudges one parked worker: the ramp limit moves with elapsed
    /// time alone, and a polling driver is a convenient heartbeat.
    pub fn stats(&self) -> QueueStats {
        let (stats, limit) = {
            let state = self.inner.state.lock();
            (
                QueueStats {
                    sampled_at: Utc::now(),
                    pending_count: state.pending.len(),
                    in_progress_count: state.in_progress.len(),
                    completed_count: state.completed_count,
                },
                state.active_limit(self.inner.config.worker_count),
            )
        };

        self.inner.admit.notify_one();
        telemetry::set_queue_depth(
            stats.pending_count,
            stats.in_progress_count,
        );
        telemetry::set_active_limit(limit);
        stats
    }

    /// Install a new ramp (or none) and zero the completion counter.
    ///
    /// Only legal between phases, when no item is pending or executing.
    pub fn reset(&self, ramp: Option<TimeRamp>) -> anyhow::Result<()> {
        let mut state = self.inner.state.lock();
        anyhow::ensure!(
            state.pending.is_empty(),
            "reset with {} items still pending",
            state.pending.len()
        );
        anyhow::ensure!(
            state.in_progress.is_empty(),
            "reset with {} items still executing",
            state.in_progress.len()
        );
        state.completed_count = 0;
        state.ramp = ramp;
        Ok(())
    }

    /// The concurrency cap as of now.
    pub fn active_limit(&self) -> usize {
        self.inner
            .state
            .lock()
            .active_limit(self.inner.config.worker_count)
    }

    /// Subscribe to item lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn events(&self) -> &InProcEventBus {
        &self.inner.events
    }

    /// Stop the worker pool and wait for the workers to park.
    ///
    /// In-flight items run to completion; pending items stay queued.
    pub async fn shutdown(&self) {
        tracing::info!("initiating work queue shutdown");
        self.inner.shutdown.cancel();

        let handles = {
            let mut guard = self.inner.worker_handles.lock().await;
            std::mem::take(&mut *guard)
        };

        for handle in handles {
            match tokio::time::timeout(Duration::from_secs(30), handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("worker task failed: {e:?}"),
                Err(_) => {
                    tracing::warn!("worker task timed out during shutdown")
                }
            }
        }

        tracing::info!("work queue shutdown complete");
    }
}
