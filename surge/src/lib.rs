//! Surge - admission-controlled work queues for bulk content migration.
//!
//! A foundational crate for driving a fleet of workers against a
//! rate-sensitive downstream service: a bounded FIFO queue, a pool of
//! long-lived consumers, and a time-based ramp that widens the concurrency
//! cap as a run proves itself out.
//!
//! # Core Concepts
//!
//! - **WorkItem**: The unit of work. Items are user-defined types that
//!   implement the [`WorkItem`] trait, exposing a single fallible `run`
//!   operation; the queue treats them as opaque.
//!
//! - **WorkQueue**: The [`WorkQueue`] owns all queue state: the bounded
//!   pending list, the set of items currently executing, and the completion
//!   counter. Producers offer items with a non-blocking
//!   [`WorkQueue::try_enqueue`] and apply their own backoff when refused.
//!
//! - **TimeRamp**: The [`TimeRamp`] maps elapsed time to an allowed
//!   concurrency level, growing exponentially from a start value to an end
//!   value over a configured period. Without a ramp, the whole worker pool
//!   may be active at once.
//!
//! - **FailurePolicy**: What a worker does when an item fails: abort the
//!   process, skip and log, or retry a bounded number of times
//!   ([`FailurePolicy`]).
//!
//! - **Events**: Item lifecycle events (via [`InProcEventBus`] and
//!   [`WorkQueue::subscribe`]) enable reactive progress reporting and
//!   observability.
//!
//! # Feature Flags
//!
//! - `metrics` - Prometheus metrics support
//!
//! # Example
//!
//! ```ignore
//! use surge::{QueueConfig, TimeRamp, WorkItem, WorkQueue};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct MigrateResource { id: String }
//!
//! #[async_trait::async_trait]
//! impl WorkItem for MigrateResource {
//!     async fn run(&self) -> anyhow::Result<()> {
//!         // push one resource to the target repository
//!         Ok(())
//!     }
//!     fn label(&self) -> String { self.id.clone() }
//! }
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = QueueConfig::new(500, 16);
//! let ramp = TimeRamp::new(2, 16, Duration::from_secs(120))?;
//! let queue = WorkQueue::with_ramp(config, ramp)?;
//! queue.spawn_workers().await;
//!
//! while !queue.try_enqueue(Arc::new(MigrateResource { id: "r1".into() })) {
//!     tokio::time::sleep(Duration::from_secs(2)).await;
//! }
//! while !queue.stats().is_drained() {
//!     tokio::time::sleep(Duration::from_secs(2)).await;
//! }
//! queue.shutdown().await;
//! # Ok(())
//! # }
//! ```

/// Queue and worker-pool configuration.
///
/// The `config` module defines [`QueueConfig`] and the [`FailurePolicy`]
/// applied when an item's `run` fails.
pub mod config;

/// Item lifecycle events and the in-process broadcast bus.
///
/// The `events` module provides [`ItemEvent`], [`ItemEventPayload`], the
/// [`EventMeta`] envelope, and [`InProcEventBus`].
pub mod events;

/// The unit-of-work abstraction.
///
/// The `item` module defines the [`WorkItem`] trait and the
/// [`SharedWorkItem`] handle type.
pub mod item;

/// The bounded, admission-controlled work queue.
///
/// The `queue` module defines [`WorkQueue`] and the [`QueueStats`]
/// snapshot used by drivers to detect when a phase has drained.
pub mod queue;

/// Time-based concurrency ramping.
///
/// The `ramp` module defines [`TimeRamp`], an exponential ramp from a
/// start concurrency to an end concurrency over a fixed period.
pub mod ramp;

/// Tracing and telemetry instrumentation.
///
/// The `telemetry` module provides span constructors and metric recording
/// helpers used around item execution.
pub mod telemetry;

/// Worker pool internals and shutdown signaling.
///
/// The `worker` module runs the consumer loop and provides the
/// [`ShutdownToken`] used to park the pool.
pub mod worker;

#[cfg(feature = "metrics")]
/// Prometheus metrics.
///
/// The `metrics` module registers surge's counters, gauges, and histograms
/// when the `metrics` feature is enabled.
pub mod metrics;

pub use config::*;
pub use events::*;
pub use item::*;
pub use queue::*;
pub use ramp::*;
pub use worker::ShutdownToken;
