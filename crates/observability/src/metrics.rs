//! Step tracking metrics
//!
//! Prometheus recording functions plus an in-memory aggregator for run summaries.

use metrics::{counter, gauge, histogram};

/// Current daily step total
pub fn record_steps_current(steps: u64) {
    gauge!("step_tracker_steps_current").set(steps as f64);
}

/// Completed persistence write
pub fn record_sync_write(success: bool, latency_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!("step_tracker_sync_writes_total", "status" => status).increment(1);
    histogram!("step_tracker_sync_write_latency_ms").record(latency_ms);
}

/// Debounce expiry that did not reach the store (`no_delta`, `virtual_device`, `deferred`)
pub fn record_sync_skipped(reason: &'static str) {
    counter!("step_tracker_sync_skipped_total", "reason" => reason).increment(1);
}

pub fn record_goal_reached() {
    counter!("step_tracker_goal_reached_total").increment(1);
}

/// Startup reconciliation result (`ok`, `empty`, `error`)
pub fn record_reconciliation(status: &'static str) {
    counter!("step_tracker_reconciliations_total", "status" => status).increment(1);
}

/// Samples dropped between the sensor callback and the session loop
pub fn record_samples_dropped(count: u64) {
    if count > 0 {
        counter!("step_tracker_samples_dropped_total").increment(count);
    }
}

/// Session statistics aggregator
///
/// Aggregates in memory so a run can print a summary on exit.
#[derive(Debug, Clone, Default)]
pub struct SessionStatsAggregator {
    pub steps: u64,
    pub writes_succeeded: u64,
    pub writes_failed: u64,
    pub steps_written: u64,
    pub goal_reached: bool,
    /// Time between consecutive steps
    pub step_interval_stats: RunningStats,
    pub write_latency_stats: RunningStats,
    last_step_ms: Option<u64>,
}

impl SessionStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A step at `at_ms` since session start
    pub fn record_step(&mut self, at_ms: u64) {
        self.steps += 1;
        if let Some(last) = self.last_step_ms {
            self.step_interval_stats
                .push(at_ms.saturating_sub(last) as f64);
        }
        self.last_step_ms = Some(at_ms);
    }

    pub fn record_write(&mut self, success: bool, delta: u64, latency_ms: f64) {
        if success {
            self.writes_succeeded += 1;
            self.steps_written += delta;
            self.write_latency_stats.push(latency_ms);
        } else {
            self.writes_failed += 1;
        }
    }

    pub fn record_goal_reached(&mut self) {
        self.goal_reached = true;
    }

    pub fn summary(&self) -> SessionSummary {
        let mean_interval = self.step_interval_stats.mean();
        SessionSummary {
            steps: self.steps,
            writes_succeeded: self.writes_succeeded,
            writes_failed: self.writes_failed,
            steps_written: self.steps_written,
            goal_reached: self.goal_reached,
            cadence_spm: if mean_interval > 0.0 {
                60_000.0 / mean_interval
            } else {
                0.0
            },
            step_interval_ms: StatsSummary::from(&self.step_interval_stats),
            write_latency_ms: StatsSummary::from(&self.write_latency_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Session summary
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub steps: u64,
    pub writes_succeeded: u64,
    pub writes_failed: u64,
    pub steps_written: u64,
    pub goal_reached: bool,
    /// Steps per minute from the mean step interval
    pub cadence_spm: f64,
    pub step_interval_ms: StatsSummary,
    pub write_latency_ms: StatsSummary,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(f, "Steps detected: {}", self.steps)?;
        writeln!(f, "Cadence: {:.1} steps/min", self.cadence_spm)?;
        writeln!(f, "Step interval (ms): {}", self.step_interval_ms)?;
        writeln!(
            f,
            "Writes: {} ok, {} failed ({} steps persisted)",
            self.writes_succeeded, self.writes_failed, self.steps_written
        )?;
        writeln!(f, "Write latency (ms): {}", self.write_latency_ms)?;
        writeln!(
            f,
            "Goal reached: {}",
            if self.goal_reached { "yes" } else { "no" }
        )
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
