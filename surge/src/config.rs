use serde::{Deserialize, Serialize};

/// What a worker does when an item's `run` returns an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Log the failure and terminate the whole process.
    ///
    /// The behavior of a one-shot migration script: a single bad item stops
    /// the run so it can be inspected before anything else is touched.
    Abort,
    /// Log the failure and move on.
    ///
    /// The item still counts as completed, so a driver polling for drain is
    /// never wedged by a bad item.
    SkipAndLog,
    /// Re-run the item up to `max_attempts` total attempts, then skip it.
    Retry {
        /// Total attempts, including the first.
        max_attempts: u32,
    },
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Abort
    }
}

/// Configuration for a work queue and its worker pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Capacity bound for the pending list. `try_enqueue` refuses items
    /// beyond this.
    pub max_pending: usize,
    /// Number of long-lived workers pulling from the queue.
    pub worker_count: usize,
    /// Failure handling for item execution.
    pub failure_policy: FailurePolicy,
    /// How long a parked worker waits before rechecking admission, in
    /// milliseconds. The ramp limit moves with elapsed time alone, so
    /// parked workers recheck on this interval even when nothing nudges
    /// them.
    pub idle_recheck_ms: u64,
    /// Delay between attempts under [`FailurePolicy::Retry`], in
    /// milliseconds.
    pub retry_backoff_ms: u64,
}

impl QueueConfig {
    /// Create a configuration with the given capacity bound and worker
    /// pool size.
    pub fn new(max_pending: usize, worker_count: usize) -> Self {
        Self {
            max_pending,
            worker_count,
            failure_policy: FailurePolicy::default(),
            idle_recheck_ms: 100,
            retry_backoff_ms: 100,
        }
    }

    /// Set the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the parked-worker recheck interval.
    pub fn with_idle_recheck(mut self, ms: u64) -> Self {
        self.idle_recheck_ms = ms;
        self
    }

    /// Set the retry backoff.
    pub fn with_retry_backoff(mut self, ms: u64) -> Self {
        self.retry_backoff_ms = ms;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(1024, 4)
    }
}
