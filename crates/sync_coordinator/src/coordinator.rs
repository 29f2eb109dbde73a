//! Debounced, single-flight persistence of step totals.

use std::fmt;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ContractError, DeviceProbe, StepRecord, StepStore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::SyncError;
use crate::metrics::SyncMetrics;

/// Result of a debounce expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing pending, no network call
    SkippedNoDelta,
    /// Simulator or emulator, never persisted
    SkippedVirtualDevice,
    /// A write is already in flight; flushed when it resolves
    Deferred,
    /// A write carrying `delta` new steps was started
    Dispatched { delta: u64 },
}

/// Result of an in-flight write
#[derive(Debug)]
pub enum WriteOutcome {
    Succeeded {
        delta: u64,
        latency: Duration,
    },
    /// The pending delta is kept for the next cycle
    Failed {
        error: SyncError,
        retained: u64,
        latency: Duration,
    },
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn latency(&self) -> Duration {
        match self {
            Self::Succeeded { latency, .. } | Self::Failed { latency, .. } => *latency,
        }
    }
}

struct InFlightWrite {
    handle: JoinHandle<Result<(), ContractError>>,
    delta: u64,
    started: Instant,
}

/// Sync coordinator
///
/// Owns the pending delta, the debounce deadline and at most one in-flight
/// write. It never sleeps itself: the owner waits on [`deadline`] and
/// [`write_complete`] and feeds the results back.
///
/// [`deadline`]: SyncCoordinator::deadline
/// [`write_complete`]: SyncCoordinator::write_complete
pub struct SyncCoordinator<S> {
    store: Arc<S>,
    device: Arc<dyn DeviceProbe>,
    user_id: String,
    debounce: Duration,
    pending_delta: u64,
    deadline: Option<Instant>,
    in_flight: Option<InFlightWrite>,
    /// A flush came due while a write was in flight
    write_deferred: bool,
    metrics: Arc<SyncMetrics>,
}

impl<S> fmt::Debug for SyncCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("user_id", &self.user_id)
            .field("pending_delta", &self.pending_delta)
            .field("deadline", &self.deadline)
            .field("in_flight", &self.in_flight.is_some())
            .finish()
    }
}

impl<S> SyncCoordinator<S>
where
    S: StepStore + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        device: Arc<dyn DeviceProbe>,
        user_id: impl Into<String>,
        debounce: Duration,
    ) -> Self {
        Self {
            store,
            device,
            user_id: user_id.into(),
            debounce,
            pending_delta: 0,
            deadline: None,
            in_flight: None,
            write_deferred: false,
            metrics: Arc::new(SyncMetrics::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// Steps detected but not yet confirmed persisted
    pub fn pending_delta(&self) -> u64 {
        self.pending_delta
    }

    /// When the debounced flush is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_write_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Add newly detected steps and restart the quiet period
    pub fn record_steps(&mut self, count: u64) {
        if count == 0 {
            return;
        }
        self.pending_delta += count;
        self.deadline = Some(Instant::now() + self.debounce);
        self.metrics.set_pending_delta(self.pending_delta);
    }

    /// Make a scheduled or pending flush due immediately
    pub fn flush_now(&mut self) {
        if self.pending_delta > 0 {
            self.deadline = Some(Instant::now());
        }
    }

    pub fn cancel_debounce(&mut self) {
        self.deadline = None;
    }

    /// Handle the debounce expiry with the current totals in `record`
    #[instrument(name = "sync_flush", skip(self, record), fields(user_id = %self.user_id, pending = self.pending_delta))]
    pub fn on_debounce_elapsed(&mut self, record: StepRecord) -> FlushOutcome {
        self.deadline = None;

        if self.pending_delta == 0 {
            self.metrics.inc_skipped_no_delta();
            debug!("nothing pending, write skipped");
            return FlushOutcome::SkippedNoDelta;
        }

        if self.device.is_virtual_device() {
            self.metrics.inc_skipped_virtual_device();
            debug!("virtual device, write skipped");
            return FlushOutcome::SkippedVirtualDevice;
        }

        if self.in_flight.is_some() {
            self.write_deferred = true;
            self.metrics.inc_deferred_count();
            debug!("write in flight, flush deferred");
            return FlushOutcome::Deferred;
        }

        self.dispatch(record)
    }

    fn dispatch(&mut self, record: StepRecord) -> FlushOutcome {
        let delta = self.pending_delta;
        let store = Arc::clone(&self.store);

        debug!(
            store = %store.name(),
            delta,
            total = record.steps,
            "dispatching step write"
        );

        let handle = tokio::spawn(async move { store.upsert_steps(&record).await });
        self.in_flight = Some(InFlightWrite {
            handle,
            delta,
            started: Instant::now(),
        });
        FlushOutcome::Dispatched { delta }
    }

    /// Wait for the in-flight write and fold its result in
    ///
    /// Never resolves while no write is in flight. Cancel safe.
    pub async fn write_complete(&mut self) -> WriteOutcome {
        let Some(write) = self.in_flight.as_mut() else {
            return future::pending().await;
        };
        let delta = write.delta;
        let started = write.started;
        let joined = (&mut write.handle).await;
        self.in_flight = None;

        let latency = started.elapsed();
        let outcome = match joined {
            Ok(Ok(())) => {
                self.pending_delta = self.pending_delta.saturating_sub(delta);
                self.metrics.inc_write_count();
                self.metrics.set_last_written_delta(delta);
                info!(
                    user_id = %self.user_id,
                    delta,
                    pending = self.pending_delta,
                    latency_ms = latency.as_millis() as u64,
                    "steps persisted"
                );
                WriteOutcome::Succeeded { delta, latency }
            }
            Ok(Err(e)) => {
                self.metrics.inc_failure_count();
                warn!(
                    user_id = %self.user_id,
                    error = %e,
                    retained = self.pending_delta,
                    "step write failed, delta retained"
                );
                WriteOutcome::Failed {
                    error: e.into(),
                    retained: self.pending_delta,
                    latency,
                }
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                warn!(user_id = %self.user_id, error = %e, "step write task failed");
                WriteOutcome::Failed {
                    error: SyncError::write_task(&self.user_id, e.to_string()),
                    retained: self.pending_delta,
                    latency,
                }
            }
        };

        let deferred = std::mem::take(&mut self.write_deferred);
        if self.pending_delta > 0 {
            if deferred {
                self.deadline = Some(Instant::now());
            } else if !outcome.is_success() && self.deadline.is_none() {
                // Retry the retained delta on the next cycle even if no step arrives
                self.deadline = Some(Instant::now() + self.debounce);
            }
        }
        self.metrics.set_pending_delta(self.pending_delta);
        outcome
    }

    /// Cancel the debounce and detach any in-flight write
    ///
    /// The detached write still reaches the store but its result is dropped.
    /// Returns the delta that was never confirmed.
    pub fn shutdown(&mut self) -> u64 {
        self.deadline = None;
        self.write_deferred = false;
        if let Some(write) = self.in_flight.take() {
            debug!(user_id = %self.user_id, delta = write.delta, "detaching in-flight write");
            drop(write.handle);
        }
        self.pending_delta
    }
}
