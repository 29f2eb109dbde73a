//! Session runner - wires source, store and session together.

use std::future::{self, Future};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{MotionSource, StepStore, StoreKind, TrackerBlueprint};
use motion_source::{MockMotionSource, MockMotionSourceConfig, ReplayConfig, ReplayMotionSource};
use observability::SessionStatsAggregator;
use sync_coordinator::{HttpStepStore, MemoryStepStore};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracker::{
    resolve_goal, steps_earlier_this_week, SessionHandle, SessionOptions, TrackerEvent,
    TrackingSession,
};

use super::RunStats;
use crate::cli::SourceKind;
use crate::error::CliError;

/// How long the final flush may take before the session is stopped anyway
const FINAL_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const FINISH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub blueprint: TrackerBlueprint,
    pub source: SourceKind,
    pub replay_path: Option<PathBuf>,
    pub replay_speed: f64,
    pub replay_loop: bool,
    pub virtual_device: bool,
    pub cadence_spm: f64,
    /// Session length (None = until shutdown)
    pub duration: Option<Duration>,
    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
    pub print_steps: bool,
}

/// Runs one tracking session to completion
pub struct SessionRunner {
    config: RunnerConfig,
}

impl SessionRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run until the duration elapses, the replay ends, or `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<RunStats>
    where
        F: Future<Output = ()>,
    {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let store_config = &self.config.blueprint.store;
        match store_config.kind {
            StoreKind::Memory => {
                info!("Using in-memory step store (nothing persisted across runs)");
                self.run_with_store(Arc::new(MemoryStepStore::new()), shutdown)
                    .await
            }
            StoreKind::Http => {
                let store = HttpStepStore::from_config(store_config)
                    .map_err(|e| CliError::store_setup(e.to_string()))?;
                info!(base_url = %store.base_url(), "Using REST step store");
                self.run_with_store(Arc::new(store), shutdown).await
            }
        }
    }

    async fn run_with_store<S, F>(&self, store: Arc<S>, shutdown: F) -> Result<RunStats>
    where
        S: StepStore + Send + Sync + 'static,
        F: Future<Output = ()>,
    {
        let blueprint = &self.config.blueprint;
        let user_id = blueprint.session.user_id.clone();
        let goal = resolve_goal(store.as_ref(), &user_id, blueprint.goal).await;
        let options = SessionOptions::from_blueprint(blueprint, goal);

        match self.config.source {
            SourceKind::Mock => {
                let threshold = blueprint.activities.get(options.profile.activity).threshold;
                let source = Arc::new(MockMotionSource::new(
                    "mock-accelerometer",
                    MockMotionSourceConfig {
                        cadence_spm: self.config.cadence_spm,
                        virtual_device: self.config.virtual_device,
                        ..MockMotionSourceConfig::for_threshold(threshold)
                    },
                ));
                info!(cadence_spm = self.config.cadence_spm, "Running with MOCK accelerometer");
                self.drive(source, store, options, shutdown, || false).await
            }
            SourceKind::Replay => {
                let path = self
                    .config
                    .replay_path
                    .clone()
                    .context("Replay source needs --replay <PATH>")?;
                let source = ReplayMotionSource::load(
                    &path,
                    ReplayConfig {
                        speed_multiplier: self.config.replay_speed,
                        loop_playback: self.config.replay_loop,
                        virtual_device: self.config.virtual_device,
                    },
                )
                .map_err(|e| CliError::source_setup(path.display().to_string(), e.to_string()))?;
                info!(
                    path = %path.display(),
                    records = source.len(),
                    duration_ms = source.duration_ms(),
                    "Running in REPLAY mode"
                );

                let source = Arc::new(source);
                let finished = {
                    let source = Arc::clone(&source);
                    move || source.is_finished()
                };
                self.drive(source, store, options, shutdown, finished).await
            }
        }
    }

    async fn drive<M, S, F, D>(
        &self,
        source: Arc<M>,
        store: Arc<S>,
        options: SessionOptions,
        shutdown: F,
        source_finished: D,
    ) -> Result<RunStats>
    where
        M: MotionSource + 'static,
        S: StepStore + Send + Sync + 'static,
        F: Future<Output = ()>,
        D: Fn() -> bool,
    {
        let start_time = Instant::now();
        let virtual_device = source.is_virtual_device();
        let earlier_this_week = if options.goal.weekly_goal > 0 {
            let today = chrono::Local::now().date_naive();
            steps_earlier_this_week(store.as_ref(), &options.user_id, today).await
        } else {
            None
        };

        let handle = TrackingSession::spawn(source, store, options);
        let mut events = handle.subscribe_events();
        let mut aggregator = SessionStatsAggregator::new();

        let deadline = self.config.duration.map(|d| tokio::time::Instant::now() + d);
        let mut finish_poll = tokio::time::interval(FINISH_POLL_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping session...");
                    break;
                }
                _ = sleep_until_optional(deadline) => {
                    info!("Session duration reached");
                    break;
                }
                _ = finish_poll.tick() => {
                    if source_finished() {
                        info!("Motion source finished");
                        break;
                    }
                }
                event = events.recv() => match event {
                    Ok(event) => self.on_event(event, &mut aggregator),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event receiver lagged");
                    }
                    Err(RecvError::Closed) => {
                        warn!("Session ended unexpectedly");
                        break;
                    }
                },
            }
        }

        self.final_flush(&handle, &mut events, &mut aggregator, virtual_device)
            .await;

        let report = handle
            .stop()
            .await
            .map_err(|e| CliError::session(e.to_string()))?;

        Ok(RunStats {
            weekly_steps: earlier_this_week.map(|steps| steps + report.state.steps),
            report,
            summary: aggregator.summary(),
            duration: start_time.elapsed(),
        })
    }

    /// Flush pending steps and wait briefly for the write to land
    async fn final_flush(
        &self,
        handle: &SessionHandle,
        events: &mut broadcast::Receiver<TrackerEvent>,
        aggregator: &mut SessionStatsAggregator,
        virtual_device: bool,
    ) {
        let pending = handle.sync_metrics().pending_delta();
        if pending == 0 || virtual_device {
            return;
        }
        if handle.flush().await.is_err() {
            return;
        }

        info!(pending, "Flushing pending steps...");
        let waited = tokio::time::timeout(FINAL_FLUSH_TIMEOUT, async {
            while let Ok(event) = events.recv().await {
                let done = match &event {
                    TrackerEvent::SyncFailed { .. } => true,
                    // An earlier in-flight write may complete before the flushed one
                    TrackerEvent::SyncCompleted { .. } => handle.sync_metrics().pending_delta() == 0,
                    _ => false,
                };
                self.on_event(event, aggregator);
                if done {
                    break;
                }
            }
        })
        .await;

        if waited.is_err() {
            warn!(
                timeout_secs = FINAL_FLUSH_TIMEOUT.as_secs(),
                "Final flush timed out"
            );
        }
    }

    fn on_event(&self, event: TrackerEvent, aggregator: &mut SessionStatsAggregator) {
        match event {
            TrackerEvent::StepDetected { steps, at_ms } => {
                aggregator.record_step(at_ms);
                if self.config.print_steps {
                    println!("step {steps} at {:.2}s", at_ms as f64 / 1000.0);
                }
            }
            TrackerEvent::GoalReached { steps, daily_goal } => {
                aggregator.record_goal_reached();
                info!(steps, daily_goal, "Daily goal reached, detection paused");
            }
            TrackerEvent::SyncCompleted { delta, latency_ms } => {
                aggregator.record_write(true, delta, latency_ms as f64);
                info!(delta, latency_ms, "Steps persisted");
            }
            TrackerEvent::SyncFailed { message, retained } => {
                aggregator.record_write(false, 0, 0.0);
                warn!(error = %message, retained, "Step write failed, will retry");
            }
            TrackerEvent::Reconciled {
                remote_steps,
                merged_steps,
            } => {
                info!(remote_steps, merged_steps, "Resumed from persisted steps");
            }
            TrackerEvent::ReconciliationFailed { message } => {
                warn!(error = %message, "Could not load persisted steps");
            }
            TrackerEvent::SensorUnavailable { source_id, reason } => {
                warn!(source_id = %source_id, reason = %reason, "Accelerometer unavailable");
            }
            TrackerEvent::DetectionDisabled { source_id } => {
                warn!(source_id = %source_id, "Step detection disabled on virtual device");
            }
        }
    }
}

async fn sleep_until_optional(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Goal, UserPhysicalProfile};
    use motion_source::ManualMotionSource;
    use tokio::time::{sleep, timeout};

    const TICK: Duration = Duration::from_millis(50);

    fn runner() -> SessionRunner {
        SessionRunner::new(RunnerConfig {
            blueprint: TrackerBlueprint::default(),
            source: SourceKind::Mock,
            replay_path: None,
            replay_speed: 1.0,
            replay_loop: false,
            virtual_device: false,
            cadence_spm: 110.0,
            duration: None,
            metrics_port: None,
            print_steps: false,
        })
    }

    fn options() -> SessionOptions {
        SessionOptions {
            user_id: "u-1".to_string(),
            goal: Goal::default(),
            profile: UserPhysicalProfile {
                weight_kg: 70.0,
                height_cm: 175.0,
                age_years: 30,
                ..UserPhysicalProfile::default()
            },
            ..SessionOptions::default()
        }
    }

    async fn walk(source: &ManualMotionSource, samples: usize) {
        for _ in 0..samples {
            source.emit_magnitude(20.0);
            sleep(TICK).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_flush_waits_for_deferred_write() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new().with_latency(Duration::from_millis(1000)));
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options());
        let mut events = handle.subscribe_events();
        let mut aggregator = SessionStatsAggregator::new();

        timeout(Duration::from_secs(5), async {
            while source.subscriber_count() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        // One step, then its write is in flight from 2450 ms to 3450 ms
        walk(&source, 10).await;
        sleep(Duration::from_millis(2000)).await;
        assert!(handle.sync_metrics().pending_delta() > 0);

        // A second step while the first write is still running
        walk(&source, 7).await;
        assert_eq!(handle.state().steps, 2);

        runner()
            .final_flush(&handle, &mut events, &mut aggregator, false)
            .await;
        assert_eq!(handle.sync_metrics().pending_delta(), 0);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.unsynced_delta, 0);
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.write_log().last().unwrap().steps, 2);
        assert_eq!(aggregator.summary().writes_succeeded, 2);
    }
}
