use async_trait::async_trait;
use std::sync::Arc;

/// A single unit of migration work.
///
/// Implementors wrap whatever moves one piece of content to the target
/// service, typically a blocking network call. The queue treats items as
/// opaque: once accepted by [`WorkQueue::try_enqueue`](crate::queue::WorkQueue::try_enqueue)
/// the item belongs to the queue until a worker finishes it, and the queue
/// never looks inside beyond [`WorkItem::label`].
///
/// Items carry no identifier. Identity is the allocation itself, so the
/// handle returned from [`WorkQueue::next_item`](crate::queue::WorkQueue::next_item)
/// must be the one handed back to
/// [`WorkQueue::item_completed`](crate::queue::WorkQueue::item_completed).
#[async_trait]
pub trait WorkItem: Send + Sync + 'static {
    /// Perform the work.
    ///
    /// Retry, if any, happens according to the queue's
    /// [`FailurePolicy`](crate::config::FailurePolicy); implementations do
    /// not need their own retry loop.
    async fn run(&self) -> anyhow::Result<()>;

    /// Short label used in logs, spans, and events.
    fn label(&self) -> String {
        "work-item".to_string()
    }
}

/// Shared handle to a queued work item.
pub type SharedWorkItem = Arc<dyn WorkItem>;

/// Whether two handles refer to the same queued item.
pub(crate) fn same_item(a: &SharedWorkItem, b: &SharedWorkItem) -> bool {
    // Compare data pointers only; vtable pointers are not stable across
    // codegen units.
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopItem;

    #[async_trait]
    impl WorkItem for NoopItem {
        async fn run(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_same_item_tracks_allocation_identity() {
        let a: SharedWorkItem = Arc::new(NoopItem);
        let b: SharedWorkItem = Arc::new(NoopItem);
        let a_clone = Arc::clone(&a);

        assert!(same_item(&a, &a_clone));
        assert!(!same_item(&a, &b));
    }

    #[tokio::test]
    async fn test_default_label() {
        let item: SharedWorkItem = Arc::new(NoopItem);
        assert_eq!(item.label(), "work-item");
        item.run().await.unwrap();
    }
}
