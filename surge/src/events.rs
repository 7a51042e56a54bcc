use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Metadata envelope attached to every item event.
#[derive(Clone, Debug)]
pub struct EventMeta {
    /// The item's label.
    pub label: String,
    /// The worker handling the item, when one is involved.
    pub worker_id: Option<String>,
    /// When the event was emitted.
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    /// Build metadata stamped with the current time.
    pub fn new(label: impl Into<String>, worker_id: Option<String>) -> Self {
        Self {
            label: label.into(),
            worker_id,
            timestamp: Utc::now(),
        }
    }
}

/// Lifecycle event for a queued item.
#[derive(Clone, Debug)]
pub struct ItemEvent {
    /// Event metadata.
    pub meta: EventMeta,
    /// What happened.
    pub payload: ItemEventPayload,
}

/// Payload emitted for item lifecycle transitions.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum ItemEventPayload {
    /// Item was accepted into the pending list.
    Enqueued {
        /// Pending-list depth right after acceptance.
        pending_depth: usize,
    },
    /// Item was checked out by a worker.
    Started,
    /// Item finished successfully.
    Completed {
        /// Wall time spent executing, in milliseconds.
        duration_ms: u64,
    },
    /// One execution attempt failed; the worker may retry per policy.
    AttemptFailed {
        /// 1-based attempt number.
        attempt: u32,
        /// Rendered error.
        error: String,
    },
    /// Item was abandoned after exhausting its policy. Still counted as
    /// completed for drain purposes.
    Skipped {
        /// Rendered error from the final attempt.
        error: String,
    },
}

/// In-process broadcast bus for item events.
///
/// Publishing never blocks: slow subscribers observe `Lagged` on their
/// receiver rather than applying backpressure to workers, and an event with
/// no subscribers at all is dropped.
#[derive(Debug)]
pub struct InProcEventBus {
    sender: broadcast::Sender<ItemEvent>,
}

impl InProcEventBus {
    /// Create a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: ItemEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to item events.
    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InProcEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(ItemEvent {
            meta: EventMeta::new("resource-42", None),
            payload: ItemEventPayload::Enqueued { pending_depth: 1 },
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.meta.label, "resource-42");
        assert!(matches!(
            event.payload,
            ItemEventPayload::Enqueued { pending_depth: 1 }
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = InProcEventBus::new(16);
        // Must not panic or error.
        bus.publish(ItemEvent {
            meta: EventMeta::new("orphan", None),
            payload: ItemEventPayload::Started,
        });
    }

    #[tokio::test]
    async fn test_each_subscriber_sees_every_event() {
        let bus = InProcEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(ItemEvent {
            meta: EventMeta::new("module-7", Some("w0".into())),
            payload: ItemEventPayload::Completed { duration_ms: 12 },
        });

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.meta.worker_id.as_deref(), Some("w0"));
        }
    }
}
