//! Tracing and telemetry instrumentation for surge.
//!
//! Helper functions for creating tracing spans and recording metrics during
//! item lifecycle events. All functions work both with and without the
//! `metrics` feature flag; when it is off they log and nothing else.

use std::future::Future;
use std::time::Instant;
use tracing::{info_span, Instrument, Span};

/// Create a tracing span for item execution on a worker.
///
/// The span carries the worker id and the item's label.
#[must_use]
pub fn item_execute_span(
    worker_id: impl AsRef<str>,
    label: impl AsRef<str>,
) -> Span {
    info_span!(
        "surge.execute",
        worker_id = %worker_id.as_ref(),
        label = %label.as_ref(),
    )
}

/// Instrument a future with an item execution span.
pub fn instrument_execution<F>(
    worker_id: impl AsRef<str>,
    label: impl AsRef<str>,
    future: F,
) -> impl Future<Output = F::Output>
where
    F: Future,
{
    let span = item_execute_span(worker_id, label);
    future.instrument(span)
}

/// Record an item acceptance in logs and metrics.
pub fn record_item_enqueued(label: impl AsRef<str>, pending_depth: usize) {
    tracing::debug!(
        label = %label.as_ref(),
        pending_depth = pending_depth,
        "item enqueued"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_item_enqueued(pending_depth);
}

/// Record an item completion in logs and metrics.
///
/// `status` is `"success"` or `"skipped"`.
pub fn record_item_completed(
    label: impl AsRef<str>,
    status: impl AsRef<str>,
    duration_secs: f64,
) {
    tracing::info!(
        label = %label.as_ref(),
        status = %status.as_ref(),
        duration_secs = duration_secs,
        "item completed"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::record_item_completed(status.as_ref(), duration_secs);
}

/// Update the queue depth gauges.
pub fn set_queue_depth(pending: usize, in_progress: usize) {
    tracing::trace!(
        pending = pending,
        in_progress = in_progress,
        "queue depth sampled"
    );

    #[cfg(feature = "metrics")]
    crate::metrics::set_queue_depth(pending as f64, in_progress as f64);
}

/// Update the admission limit gauge.
pub fn set_active_limit(limit: usize) {
    tracing::trace!(limit = limit, "active limit sampled");

    #[cfg(feature = "metrics")]
    crate::metrics::set_active_limit(limit as f64);
}

/// Start timing an item execution.
///
/// Returns a handle to pass to [`record_item_end`].
pub fn record_item_start(label: impl AsRef<str>) -> ItemTimingHandle {
    ItemTimingHandle {
        label: label.as_ref().to_string(),
        start: Instant::now(),
    }
}

/// Finish timing an item execution and record its duration.
pub fn record_item_end(handle: ItemTimingHandle, status: impl AsRef<str>) {
    let duration_secs = handle.start.elapsed().as_secs_f64();
    record_item_completed(&handle.label, status, duration_secs);
}

/// Handle for tracking item execution duration.
#[derive(Debug)]
pub struct ItemTimingHandle {
    label: String,
    start: Instant,
}

impl ItemTimingHandle {
    /// The item label this handle was started with.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Elapsed time since the item started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_execute_span() {
        let span = item_execute_span("w0", "resource-1");
        assert_eq!(span.metadata().unwrap().name(), "surge.execute");
    }

    #[test]
    fn test_timing_handle() {
        let handle = record_item_start("resource-1");
        assert_eq!(handle.label(), "resource-1");

        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(handle.elapsed().as_nanos() > 0);

        record_item_end(handle, "success");
    }
}
