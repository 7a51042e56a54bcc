use std::time::{Duration, Instant};

/// Time-indexed concurrency limit that grows exponentially from a start
/// value to an end value over a fixed period, then holds steady.
///
/// Growth is constant in relative terms: wherever a doubling happens inside
/// the period, it takes the same amount of time. A run therefore starts
/// cautiously, with few workers admitted, and accelerates once the
/// downstream service has absorbed the early load.
///
/// A ramp is constructed once per migration phase and is immutable; the
/// clock starts at construction.
#[derive(Clone, Debug)]
pub struct TimeRamp {
    start_value: usize,
    end_value: usize,
    period: Duration,
    /// Per-millisecond growth factor, `exp(ln(end / start) / period_ms)`.
    growth: f64,
    started_at: Instant,
}

impl TimeRamp {
    /// Create a ramp whose clock starts now.
    ///
    /// Fails if `start_value` is zero, `end_value` is below `start_value`,
    /// or `period` is zero.
    pub fn new(
        start_value: usize,
        end_value: usize,
        period: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(start_value > 0, "ramp start value must be positive");
        anyhow::ensure!(
            end_value >= start_value,
            "ramp end value {} is below start value {}",
            end_value,
            start_value
        );
        anyhow::ensure!(!period.is_zero(), "ramp period must be non-zero");

        let period_ms = period.as_secs_f64() * 1000.0;
        let growth =
            ((end_value as f64 / start_value as f64).ln() / period_ms).exp();

        Ok(Self {
            start_value,
            end_value,
            period,
            growth,
            started_at: Instant::now(),
        })
    }

    /// The limit at `elapsed` time into the ramp.
    ///
    /// Clamped to `start_value` at zero and to `end_value` at or beyond the
    /// period; exponential interpolation in between.
    pub fn value_at(&self, elapsed: Duration) -> usize {
        if elapsed.is_zero() {
            return self.start_value;
        }
        if elapsed >= self.period {
            return self.end_value;
        }
        let t = elapsed.as_secs_f64() * 1000.0;
        (self.start_value as f64 * self.growth.powf(t)).floor() as usize
    }

    /// The limit right now, measured from construction time.
    pub fn current_value(&self) -> usize {
        self.value_at(self.started_at.elapsed())
    }

    /// Initial concurrency limit.
    pub fn start_value(&self) -> usize {
        self.start_value
    }

    /// Final concurrency limit once the period has elapsed.
    pub fn end_value(&self) -> usize {
        self.end_value
    }

    /// How long the ramp takes to reach its end value.
    pub fn period(&self) -> Duration {
        self.period
    }
}
