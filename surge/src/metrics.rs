//! Prometheus metrics instrumentation for surge.
//!
//! All metrics are compiled only when the `metrics` feature is enabled.
//!
//! # Metrics
//!
//! ## Counters
//! - `surge_items_enqueued_total` - Items accepted into the pending list
//! - `surge_items_completed_total` - Items finished, by status
//!
//! ## Gauges
//! - `surge_pending_items` - Current pending-list depth
//! - `surge_in_progress_items` - Items currently executing
//! - `surge_active_limit` - Current admission limit
//!
//! ## Histograms
//! - `surge_item_duration_seconds` - Item execution duration, by status

use prometheus::{
    exponential_buckets, Counter, CounterVec, Gauge, HistogramVec, Opts,
    Registry,
};
use std::sync::LazyLock;

/// Global Prometheus registry for surge metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Counter for items accepted into the pending list.
pub static ITEMS_ENQUEUED_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    Counter::new(
        "surge_items_enqueued_total",
        "Items accepted into the pending list",
    )
    .expect("surge_items_enqueued_total metric creation failed")
});

/// Counter for finished items.
///
/// Labels:
/// - `status`: `success` or `skipped`
pub static ITEMS_COMPLETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new("surge_items_completed_total", "Items finished");
    CounterVec::new(opts, &["status"])
        .expect("surge_items_completed_total metric creation failed")
});

/// Gauge for the current pending-list depth.
pub static PENDING_ITEMS: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("surge_pending_items", "Current pending-list depth")
        .expect("surge_pending_items metric creation failed")
});

/// Gauge for items currently executing on a worker.
pub static IN_PROGRESS_ITEMS: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("surge_in_progress_items", "Items currently executing")
        .expect("surge_in_progress_items metric creation failed")
});

/// Gauge for the current admission limit.
pub static ACTIVE_LIMIT: LazyLock<Gauge> = LazyLock::new(|| {
    Gauge::new("surge_active_limit", "Current admission limit")
        .expect("surge_active_limit metric creation failed")
});

/// Histogram for item execution duration in seconds.
///
/// Labels:
/// - `status`: `success` or `skipped`
pub static ITEM_DURATION_SECONDS: LazyLock<HistogramVec> =
    LazyLock::new(|| {
        let buckets = exponential_buckets(0.001, 2.0, 15)
            .expect("bucket creation failed");
        let opts = prometheus::HistogramOpts::new(
            "surge_item_duration_seconds",
            "Item execution duration in seconds",
        )
        .buckets(buckets);
        HistogramVec::new(opts, &["status"])
            .expect("surge_item_duration_seconds metric creation failed")
    });

/// Register all surge metrics with the global registry.
///
/// Idempotent: re-registering an already-registered collector is reported
/// by prometheus and ignored here.
pub fn init_metrics() -> anyhow::Result<()> {
    let registry = &*REGISTRY;

    for collector in [
        Box::new(ITEMS_ENQUEUED_TOTAL.clone())
            as Box<dyn prometheus::core::Collector>,
        Box::new(ITEMS_COMPLETED_TOTAL.clone()),
        Box::new(PENDING_ITEMS.clone()),
        Box::new(IN_PROGRESS_ITEMS.clone()),
        Box::new(ACTIVE_LIMIT.clone()),
        Box::new(ITEM_DURATION_SECONDS.clone()),
    ] {
        if let Err(err) = registry.register(collector) {
            match err {
                prometheus::Error::AlreadyReg => {}
                other => return Err(other.into()),
            }
        }
    }

    Ok(())
}

pub(crate) fn record_item_enqueued(pending_depth: usize) {
    ITEMS_ENQUEUED_TOTAL.inc();
    PENDING_ITEMS.set(pending_depth as f64);
}

pub(crate) fn record_item_completed(status: &str, duration_secs: f64) {
    ITEMS_COMPLETED_TOTAL.with_label_values(&[status]).inc();
    ITEM_DURATION_SECONDS
        .with_label_values(&[status])
        .observe(duration_secs);
}

pub(crate) fn set_queue_depth(pending: f64, in_progress: f64) {
    PENDING_ITEMS.set(pending);
    IN_PROGRESS_ITEMS.set(in_progress);
}

pub(crate) fn set_active_limit(limit: f64) {
    ACTIVE_LIMIT.set(limit);
}
