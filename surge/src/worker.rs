use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::config::FailurePolicy;
use crate::events::{EventMeta, InProcEventBus, ItemEvent, ItemEventPayload};
use crate::item::SharedWorkItem;
use crate::queue::WorkQueue;
use crate::telemetry;

/// Token for signaling shutdown to the worker pool.
#[derive(Clone, Debug)]
pub struct ShutdownToken {
    inner: Arc<ShutdownTokenInner>,
}

#[derive(Debug)]
struct ShutdownTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl ShutdownToken {
    /// Create a new shutdown token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownTokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Check if cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancelled.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Interest is registered before the flag check so a cancel landing
        // between the two is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of executing one item under the queue's failure policy.
enum ExecOutcome {
    Success,
    Skipped { error: String },
}

/// Long-lived consumer loop.
///
/// Pulls one item at a time, executes it under the queue's failure policy,
/// and reports completion back to the queue. Terminates only when the queue
/// shuts down. There is no retry at this layer beyond what the policy
/// prescribes.
pub(crate) async fn run_worker(worker_id: String, queue: WorkQueue) {
    let policy = queue.config().failure_policy;
    let backoff = Duration::from_millis(queue.config().retry_backoff_ms);

    loop {
        let Some(item) = queue.next_item().await else {
            break;
        };
        let label = item.label();

        queue.events().publish(ItemEvent {
            meta: EventMeta::new(label.clone(), Some(worker_id.clone())),
            payload: ItemEventPayload::Started,
        });

        let timing = telemetry::record_item_start(&label);
        let outcome = telemetry::instrument_execution(
            &worker_id,
            &label,
            execute_with_policy(
                &worker_id,
                &item,
                &label,
                policy,
                backoff,
                queue.events(),
            ),
        )
        .await;
        let duration_ms = timing.elapsed().as_millis() as u64;

        match outcome {
            ExecOutcome::Success => {
                telemetry::record_item_end(timing, "success");
                queue.events().publish(ItemEvent {
                    meta: EventMeta::new(
                        label.clone(),
                        Some(worker_id.clone()),
                    ),
                    payload: ItemEventPayload::Completed { duration_ms },
                });
            }
            ExecOutcome::Skipped { error } => {
                telemetry::record_item_end(timing, "skipped");
                queue.events().publish(ItemEvent {
                    meta: EventMeta::new(
                        label.clone(),
                        Some(worker_id.clone()),
                    ),
                    payload: ItemEventPayload::Skipped { error },
                });
            }
        }

        if let Err(err) = queue.item_completed(&item) {
            tracing::error!(
                worker_id = %worker_id,
                label = %label,
                "item completion bookkeeping failed: {err}"
            );
        }
    }

    tracing::info!(worker_id = %worker_id, "worker shutting down");
}

/// Execute one item, applying the configured failure policy.
///
/// Under [`FailurePolicy::Abort`] a failure terminates the process; the
/// other policies resolve to [`ExecOutcome::Skipped`] once attempts are
/// exhausted so the item still drains from the queue.
async fn execute_with_policy(
    worker_id: &str,
    item: &SharedWorkItem,
    label: &str,
    policy: FailurePolicy,
    backoff: Duration,
    events: &InProcEventBus,
) -> ExecOutcome {
    let max_attempts = match policy {
        FailurePolicy::Retry { max_attempts } => max_attempts.max(1),
        _ => 1,
    };

    let mut attempt = 1u32;
    loop {
        match item.run().await {
            Ok(()) => return ExecOutcome::Success,
            Err(err) => match policy {
                FailurePolicy::Abort => {
                    tracing::error!(
                        worker_id = %worker_id,
                        label = %label,
                        error = %err,
                        "item failed, aborting run"
                    );
                    std::process::exit(1);
                }
                FailurePolicy::SkipAndLog => {
                    tracing::warn!(
                        worker_id = %worker_id,
                        label = %label,
                        error = %err,
                        "item failed, skipping"
                    );
                    return ExecOutcome::Skipped {
                        error: err.to_string(),
                    };
                }
                FailurePolicy::Retry { .. } => {
                    events.publish(ItemEvent {
                        meta: EventMeta::new(
                            label.to_string(),
                            Some(worker_id.to_string()),
                        ),
                        payload: ItemEventPayload::AttemptFailed {
                            attempt,
                            error: err.to_string(),
                        },
                    });

                    if attempt >= max_attempts {
                        tracing::error!(
                            worker_id = %worker_id,
                            label = %label,
                            attempts = attempt,
                            error = %err,
                            "item failed on final attempt, skipping"
                        );
                        return ExecOutcome::Skipped {
                            error: err.to_string(),
                        };
                    }

                    tracing::warn!(
                        worker_id = %worker_id,
                        label = %label,
                        attempt = attempt,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                }
            },
        }
    }
}
