//! Phased bulk-migration demo.
//!
//! Simulates a driver pushing two phases of content ("resources", then
//! "modules") through a ramped work queue: a backoff loop on the producer
//! side, stats polling to detect drain, and a fresh ramp installed between
//! phases.
//!
//! Run with: `cargo run --example migration_driver`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use surge::{FailurePolicy, QueueConfig, TimeRamp, WorkItem, WorkQueue};

/// A simulated per-document migration: sleeps in place of the network call
/// that would push one document to the target repository.
struct MigrateDocument {
    id: String,
    transfer_ms: u64,
}

impl MigrateDocument {
    fn new(phase: &str, index: usize) -> Arc<Self> {
        Arc::new(Self {
            id: format!("{phase}-{index:03}"),
            // Deterministic spread of transfer times, 20-80ms.
            transfer_ms: 20 + (index as u64 % 7) * 10,
        })
    }
}

#[async_trait]
impl WorkItem for MigrateDocument {
    async fn run(&self) -> anyhow::Result<()> {
        tokio::time::sleep(Duration::from_millis(self.transfer_ms)).await;
        tracing::debug!(id = %self.id, "document transferred");
        Ok(())
    }

    fn label(&self) -> String {
        self.id.clone()
    }
}

async fn run_phase(
    queue: &WorkQueue,
    phase: &str,
    count: usize,
) -> anyhow::Result<()> {
    tracing::info!(phase = phase, count = count, "phase starting");

    for i in 0..count {
        let item = MigrateDocument::new(phase, i);
        // Backpressure: a refused enqueue means slow down, not give up.
        while !queue.try_enqueue(item.clone()) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    loop {
        let stats = queue.stats();
        tracing::info!(
            phase = phase,
            pending = stats.pending_count,
            in_progress = stats.in_progress_count,
            completed = stats.completed_count,
            limit = queue.active_limit(),
            "phase progress"
        );
        if stats.is_drained() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    tracing::info!(phase = phase, "phase drained");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = QueueConfig::new(32, 8)
        .with_failure_policy(FailurePolicy::SkipAndLog)
        .with_idle_recheck(50);
    let ramp = TimeRamp::new(1, 8, Duration::from_secs(2))?;
    let queue = WorkQueue::with_ramp(config, ramp)?;
    queue.spawn_workers().await;

    run_phase(&queue, "resources", 60).await?;

    // Each phase gets its own independent throughput ramp.
    queue.reset(Some(TimeRamp::new(2, 8, Duration::from_secs(1))?))?;
    run_phase(&queue, "modules", 40).await?;

    queue.shutdown().await;
    Ok(())
}
