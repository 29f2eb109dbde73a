//! Tracking session event loop.

use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::{
    ContractError, DetectorConfig, DeviceProbe, Goal, HourlyRateBasis, MotionSource, StepQuery,
    StepRecord, StepStore, StepTrackerState, TrackerBlueprint, UserPhysicalProfile,
    VirtualDevicePolicy, ActivityTable,
};
use fitness_metrics::{GoalEvaluator, MetricsCalculator};
use step_detector::{DetectorSettings, StepDetector};
use sync_coordinator::{
    fetch_latest_record, merge_reconciled, FlushOutcome, SyncCoordinator, SyncMetrics,
    WriteOutcome,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use crate::bridge::SampleBridge;
use crate::error::{Result, SessionError};
use crate::events::{SessionReport, TrackerEvent};

const COMMAND_CAPACITY: usize = 16;
const EVENT_CAPACITY: usize = 256;

/// Everything a session needs besides its collaborators
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub user_id: String,
    pub detector: DetectorConfig,
    pub debounce: Duration,
    pub virtual_device_policy: VirtualDevicePolicy,
    pub activities: ActivityTable,
    pub hourly_rate_basis: HourlyRateBasis,
    pub profile: UserPhysicalProfile,
    pub goal: Goal,
    pub sample_channel_capacity: usize,
    /// Fetch today's persisted record on start
    pub reconcile_on_start: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_blueprint(&TrackerBlueprint::default(), Goal::default())
    }
}

impl SessionOptions {
    /// Options from a loaded blueprint plus the resolved goal
    pub fn from_blueprint(blueprint: &TrackerBlueprint, goal: Goal) -> Self {
        Self {
            user_id: blueprint.session.user_id.clone(),
            detector: blueprint.detector.clone(),
            debounce: Duration::from_millis(blueprint.sync.debounce_ms),
            virtual_device_policy: blueprint.sync.virtual_device_policy,
            activities: blueprint.activities.clone(),
            hourly_rate_basis: blueprint.metrics.hourly_rate_basis,
            profile: blueprint.profile.clone().unwrap_or_default(),
            goal,
            sample_channel_capacity: blueprint.session.sample_channel_capacity,
            reconcile_on_start: true,
        }
    }
}

enum Command {
    SetGoal(Goal),
    Flush,
    Stop,
}

/// Handle to a running session
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<StepTrackerState>,
    events_tx: broadcast::Sender<TrackerEvent>,
    events: broadcast::Receiver<TrackerEvent>,
    sync_metrics: Arc<SyncMetrics>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Latest published state
    pub fn state(&self) -> StepTrackerState {
        self.state.borrow().clone()
    }

    /// Live read model, updated on every change
    pub fn watch_state(&self) -> watch::Receiver<StepTrackerState> {
        self.state.clone()
    }

    /// Events since the session was spawned
    pub fn events(&mut self) -> &mut broadcast::Receiver<TrackerEvent> {
        &mut self.events
    }

    /// Additional receiver for events from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events_tx.subscribe()
    }

    pub fn sync_metrics(&self) -> &Arc<SyncMetrics> {
        &self.sync_metrics
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Set a new goal: re-arms the evaluator and resumes detection with a fresh window
    pub async fn set_goal(&self, goal: Goal) -> Result<()> {
        self.send(Command::SetGoal(goal)).await
    }

    /// Make pending steps due for writing now instead of after the quiet period
    pub async fn flush(&self) -> Result<()> {
        self.send(Command::Flush).await
    }

    /// Tear down and return the final report
    pub async fn stop(self) -> Result<SessionReport> {
        // Already-finished loops have dropped the receiver; the report is still in the task
        let _ = self.commands.send(Command::Stop).await;
        self.task
            .await
            .map_err(|e| SessionError::Join(e.to_string()))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Stopped)
    }
}

/// Session state machine driven by one task
pub struct TrackingSession<S> {
    options: SessionOptions,
    source: Arc<dyn MotionSource>,
    device: Arc<dyn DeviceProbe>,
    detector: StepDetector,
    evaluator: GoalEvaluator,
    calculator: MetricsCalculator,
    sync: SyncCoordinator<S>,
    bridge: SampleBridge,
    state: StepTrackerState,
    session_steps: u64,
    base_spend_minutes: f64,
    started: Instant,
    commands: mpsc::Receiver<Command>,
    reconciliation: Option<JoinHandle<std::result::Result<Option<StepRecord>, ContractError>>>,
    state_tx: watch::Sender<StepTrackerState>,
    events: broadcast::Sender<TrackerEvent>,
}

impl<S> TrackingSession<S>
where
    S: StepStore + Send + Sync + 'static,
{
    /// Start a session on the current tokio runtime
    pub fn spawn<M>(source: Arc<M>, store: Arc<S>, options: SessionOptions) -> SessionHandle
    where
        M: MotionSource + 'static,
    {
        let device: Arc<dyn DeviceProbe> = source.clone();
        let source: Arc<dyn MotionSource> = source;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(StepTrackerState::default());
        let (events_tx, events_rx) = broadcast::channel(EVENT_CAPACITY);

        let profile = &options.profile;
        let threshold = options.activities.get(profile.activity).threshold;
        let detector = StepDetector::new(DetectorSettings::from_config(
            &options.detector,
            profile.activity,
            threshold,
        ));

        let sync = SyncCoordinator::new(store, device.clone(), options.user_id.clone(), options.debounce);
        let sync_metrics = Arc::clone(sync.metrics());

        let session = Self {
            evaluator: GoalEvaluator::new(options.goal),
            calculator: MetricsCalculator::new(options.activities.clone(), options.hourly_rate_basis),
            bridge: SampleBridge::new(options.sample_channel_capacity),
            options,
            source,
            device,
            detector,
            sync,
            state: StepTrackerState::default(),
            session_steps: 0,
            base_spend_minutes: 0.0,
            started: Instant::now(),
            commands: command_rx,
            reconciliation: None,
            state_tx,
            events: events_tx.clone(),
        };

        let task = tokio::spawn(session.run());

        SessionHandle {
            commands: command_tx,
            state: state_rx,
            events_tx,
            events: events_rx,
            sync_metrics,
            task,
        }
    }

    #[instrument(name = "tracking_session", skip_all, fields(user_id = %self.options.user_id))]
    async fn run(mut self) -> SessionReport {
        self.start();

        loop {
            let deadline = self.sync.deadline();
            let attached = self.detector.is_attached();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::SetGoal(goal)) => self.on_set_goal(goal),
                    Some(Command::Flush) => self.sync.flush_now(),
                    Some(Command::Stop) | None => break,
                },
                Ok(sample) = self.bridge.receiver().recv(), if attached => {
                    self.on_sample(sample);
                }
                result = join_optional(&mut self.reconciliation) => {
                    self.on_reconciled(result);
                }
                () = sleep_until_optional(deadline) => {
                    self.on_debounce_elapsed();
                }
                outcome = self.sync.write_complete() => {
                    self.on_write_complete(outcome);
                }
            }
        }

        self.teardown()
    }

    fn start(&mut self) {
        let profile = &self.options.profile;
        if !profile.is_complete() {
            warn!(
                missing = ?profile.missing_fields(),
                "physical profile incomplete, distance and calories will read zero"
            );
        }
        if !self.options.goal.is_configured() {
            info!("no daily goal, goal evaluation disabled");
        }

        if self.options.reconcile_on_start {
            let store = Arc::clone(self.sync.store());
            let query = StepQuery::today(self.options.user_id.clone());
            self.reconciliation = Some(tokio::spawn(async move {
                fetch_latest_record(store.as_ref(), &query).await
            }));
        }

        self.attach_detector();
        self.publish();
    }

    /// Subscribe unless policy, the goal, or the source forbid it
    fn attach_detector(&mut self) {
        if self.detector.is_attached() || self.evaluator.is_reached() {
            return;
        }

        let source_id = self.source.source_id().to_string();
        if self.device.is_virtual_device() {
            match self.options.virtual_device_policy {
                VirtualDevicePolicy::Disabled => {
                    info!(source_id = %source_id, "virtual device, detection disabled");
                    self.emit(TrackerEvent::DetectionDisabled { source_id });
                    return;
                }
                VirtualDevicePolicy::DetectLocally => {
                    info!(source_id = %source_id, "virtual device, steps will not be persisted");
                }
            }
        }

        self.bridge.drain();
        match self
            .detector
            .attach(Arc::clone(&self.source), self.bridge.callback())
        {
            Ok(()) => info!(source_id = %source_id, "step detection started"),
            Err(e) => {
                warn!(source_id = %source_id, error = %e, "step detection unavailable");
                self.emit(TrackerEvent::SensorUnavailable {
                    source_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn detach_detector(&mut self) {
        self.detector.detach();
        let drained = self.bridge.drain();
        debug!(drained, "step detection paused");
    }

    fn on_sample(&mut self, sample: contracts::AccelerationSample) {
        let now_ms = self.started.elapsed().as_millis() as u64;
        let Some(step) = self.detector.on_sample(sample, now_ms) else {
            return;
        };

        self.session_steps += 1;
        if self.session_steps == 1 {
            self.state.walk_sessions += 1;
        }
        self.state.steps += 1;
        self.sync.record_steps(1);
        self.recompute_metrics();

        observability::record_steps_current(self.state.steps);
        self.emit(TrackerEvent::StepDetected {
            steps: self.state.steps,
            at_ms: step.at_ms,
        });

        self.evaluate_goal();
        self.publish();
    }

    fn on_set_goal(&mut self, goal: Goal) {
        info!(daily_goal = goal.daily_goal, weekly_goal = goal.weekly_goal, "goal updated");
        self.options.goal = goal;
        self.evaluator.reset(goal);
        self.state.goal_reached = false;

        self.evaluate_goal();
        if !self.evaluator.is_reached() {
            // Fresh window, step total untouched
            self.detach_detector();
            self.attach_detector();
        }
        self.publish();
    }

    fn evaluate_goal(&mut self) {
        if let Some(reached) = self.evaluator.evaluate(self.state.steps) {
            self.state.goal_reached = true;
            observability::record_goal_reached();
            self.emit(TrackerEvent::GoalReached {
                steps: reached.steps,
                daily_goal: reached.daily_goal,
            });
            self.detach_detector();
        }
    }

    fn on_reconciled(
        &mut self,
        result: std::result::Result<
            std::result::Result<Option<StepRecord>, ContractError>,
            JoinError,
        >,
    ) {
        let record = match result {
            Ok(Ok(Some(record))) => record,
            Ok(Ok(None)) => {
                info!("no persisted steps for today");
                observability::record_reconciliation("empty");
                return;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "reconciliation fetch failed, starting from local state");
                observability::record_reconciliation("error");
                self.emit(TrackerEvent::ReconciliationFailed {
                    message: e.to_string(),
                });
                return;
            }
            Err(e) => {
                warn!(error = %e, "reconciliation task failed");
                observability::record_reconciliation("error");
                self.emit(TrackerEvent::ReconciliationFailed {
                    message: e.to_string(),
                });
                return;
            }
        };

        let merged = merge_reconciled(&self.state, self.session_steps, &record);
        info!(
            remote_steps = record.steps,
            local_steps = self.state.steps,
            merged_steps = merged.state.steps,
            "reconciled with persisted steps"
        );

        self.state = merged.state;
        self.base_spend_minutes = merged.base_spend_minutes;
        self.recompute_metrics();

        observability::record_reconciliation("ok");
        observability::record_steps_current(self.state.steps);
        self.emit(TrackerEvent::Reconciled {
            remote_steps: record.steps,
            merged_steps: self.state.steps,
        });

        self.evaluate_goal();
        self.publish();
    }

    fn on_debounce_elapsed(&mut self) {
        self.recompute_metrics();
        let record = self.state.to_record(self.options.user_id.clone(), Utc::now());

        match self.sync.on_debounce_elapsed(record) {
            FlushOutcome::SkippedNoDelta => observability::record_sync_skipped("no_delta"),
            FlushOutcome::SkippedVirtualDevice => {
                observability::record_sync_skipped("virtual_device")
            }
            FlushOutcome::Deferred => observability::record_sync_skipped("deferred"),
            FlushOutcome::Dispatched { delta } => debug!(delta, "write dispatched"),
        }
        self.publish();
    }

    fn on_write_complete(&mut self, outcome: WriteOutcome) {
        let latency_ms = outcome.latency().as_millis() as u64;
        observability::record_sync_write(outcome.is_success(), latency_ms as f64);

        match outcome {
            WriteOutcome::Succeeded { delta, .. } => {
                self.emit(TrackerEvent::SyncCompleted { delta, latency_ms });
            }
            WriteOutcome::Failed {
                error, retained, ..
            } => {
                self.emit(TrackerEvent::SyncFailed {
                    message: error.to_string(),
                    retained,
                });
            }
        }
    }

    fn recompute_metrics(&mut self) {
        let elapsed_minutes = self.started.elapsed().as_secs_f64() / 60.0;
        let metrics = self.calculator.compute(
            self.state.steps,
            &self.options.profile,
            self.base_spend_minutes + elapsed_minutes,
        );
        self.state.apply_metrics(&metrics);
    }

    fn publish(&self) {
        self.state_tx.send_if_modified(|current| {
            if *current == self.state {
                false
            } else {
                *current = self.state.clone();
                true
            }
        });
    }

    fn emit(&self, event: TrackerEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    /// Cancel the debounce, release the source, detach any write
    fn teardown(mut self) -> SessionReport {
        self.detector.detach();
        self.bridge.drain();
        let unsynced_delta = self.sync.shutdown();
        if let Some(reconciliation) = self.reconciliation.take() {
            reconciliation.abort();
        }

        let report = SessionReport {
            state: self.state.clone(),
            session_steps: self.session_steps,
            unsynced_delta,
            sync: self.sync.metrics().snapshot(),
            dropped_samples: self.bridge.dropped(),
            goal: self.options.goal,
            elapsed: self.started.elapsed(),
        };

        observability::record_samples_dropped(report.dropped_samples);
        info!(
            steps = report.state.steps,
            session_steps = report.session_steps,
            unsynced_delta,
            "tracking session stopped"
        );
        report
    }
}

/// Await an optional task; pending forever when there is none
async fn join_optional<T>(slot: &mut Option<JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    let Some(handle) = slot.as_mut() else {
        return future::pending().await;
    };
    let result = handle.await;
    *slot = None;
    result
}

/// Sleep until `deadline`; pending forever when there is none
fn sleep_until_optional(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Gender;
    use motion_source::ManualMotionSource;
    use sync_coordinator::MemoryStepStore;
    use tokio::time::{sleep, timeout};

    const TICK: Duration = Duration::from_millis(50);

    fn options(goal: Goal) -> SessionOptions {
        let mut options = SessionOptions {
            user_id: "u-1".to_string(),
            goal,
            ..SessionOptions::default()
        };
        options.profile = UserPhysicalProfile {
            weight_kg: 70.0,
            height_cm: 175.0,
            age_years: 30,
            gender: Gender::Female,
            ..UserPhysicalProfile::default()
        };
        options
    }

    async fn wait_attached(source: &ManualMotionSource) {
        timeout(Duration::from_secs(5), async {
            while source.subscriber_count() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("detector never attached");
    }

    /// Feed `count` above-threshold samples, one per tick
    async fn walk(source: &ManualMotionSource, count: usize) {
        for _ in 0..count {
            source.emit_magnitude(20.0);
            sleep(TICK).await;
        }
    }

    async fn next_event<F>(handle: &mut SessionHandle, mut matches: F) -> TrackerEvent
    where
        F: FnMut(&TrackerEvent) -> bool,
    {
        timeout(Duration::from_secs(30), async {
            loop {
                let event = handle.events().recv().await.expect("event channel closed");
                if matches(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event never arrived")
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_are_debounced_into_one_write() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let mut handle = TrackingSession::spawn(source.clone(), store.clone(), options(Goal::default()));

        wait_attached(&source).await;
        // Samples at 0..=1150 ms: steps at 450, 800 and 1150 ms
        walk(&source, 24).await;
        assert_eq!(handle.state().steps, 3);
        assert_eq!(handle.state().walk_sessions, 1);
        assert_eq!(store.write_count(), 0);

        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
        assert!(matches!(event, TrackerEvent::SyncCompleted { delta: 3, .. }));
        assert_eq!(store.write_count(), 1);

        let persisted = store.records_for("u-1");
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].steps, 3);
        assert!(persisted[0].kilometers > 0.0);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.unsynced_delta, 0);
        assert_eq!(report.sync.write_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconciliation_adopts_persisted_total() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let persisted = StepTrackerState {
            steps: 500,
            walk_sessions: 2,
            spend_minutes: 40.0,
            ..StepTrackerState::default()
        };
        store.insert_record(persisted.to_record("u-1", Utc::now()));

        let mut handle = TrackingSession::spawn(source.clone(), store.clone(), options(Goal::default()));
        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::Reconciled { .. })).await;
        assert_eq!(
            event,
            TrackerEvent::Reconciled {
                remote_steps: 500,
                merged_steps: 500
            }
        );
        assert_eq!(handle.state().steps, 500);
        assert!(handle.state().spend_minutes >= 40.0);

        wait_attached(&source).await;
        walk(&source, 10).await;
        assert_eq!(handle.state().steps, 501);
        assert_eq!(handle.state().walk_sessions, 3);

        handle.flush().await.unwrap();
        next_event(&mut handle, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
        assert_eq!(store.records_for("u-1")[0].steps, 501);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reconciliation_merges_by_max() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new().with_latency(Duration::from_millis(1000)));
        let persisted = StepTrackerState {
            steps: 500,
            walk_sessions: 2,
            ..StepTrackerState::default()
        };
        store.insert_record(persisted.to_record("u-1", Utc::now()));

        let mut handle = TrackingSession::spawn(source.clone(), store.clone(), options(Goal::default()));
        wait_attached(&source).await;

        // Two local steps land before the fetch returns at 1000 ms
        walk(&source, 17).await;
        assert_eq!(handle.state().steps, 2);

        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::Reconciled { .. })).await;
        assert_eq!(
            event,
            TrackerEvent::Reconciled {
                remote_steps: 500,
                merged_steps: 500
            }
        );
        assert_eq!(handle.state().steps, 500);
        assert_eq!(handle.state().walk_sessions, 3);

        next_event(&mut handle, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
        assert_eq!(store.records_for("u-1")[0].steps, 500);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconciliation_failure_keeps_tracking() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        store.set_fail_reads(true);

        let mut handle = TrackingSession::spawn(source.clone(), store, options(Goal::default()));
        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::ReconciliationFailed { .. })).await;
        assert!(matches!(event, TrackerEvent::ReconciliationFailed { .. }));

        wait_attached(&source).await;
        walk(&source, 10).await;
        assert_eq!(handle.state().steps, 1);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_goal_reached_pauses_until_new_goal() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let mut handle = TrackingSession::spawn(source.clone(), store, options(Goal::new(2, 0)));

        wait_attached(&source).await;
        walk(&source, 17).await;

        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::GoalReached { .. })).await;
        assert_eq!(
            event,
            TrackerEvent::GoalReached {
                steps: 2,
                daily_goal: 2
            }
        );
        assert!(handle.state().goal_reached);
        assert_eq!(source.subscriber_count(), 0);

        // Nobody is listening while paused
        assert_eq!(source.emit_magnitude(20.0), 0);

        handle.set_goal(Goal::new(4, 0)).await.unwrap();
        wait_attached(&source).await;
        assert!(!handle.state().goal_reached);

        // Fresh window: ten samples before the next step
        walk(&source, 9).await;
        assert_eq!(handle.state().steps, 2);
        walk(&source, 1).await;
        assert_eq!(handle.state().steps, 3);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.goal, Goal::new(4, 0));
        assert_eq!(report.session_steps, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_retried_after_goal_pause() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        store.set_fail_writes(true);
        let mut handle = TrackingSession::spawn(source.clone(), store.clone(), options(Goal::new(2, 0)));

        wait_attached(&source).await;
        walk(&source, 17).await;
        assert!(handle.state().goal_reached);
        assert_eq!(source.subscriber_count(), 0);

        let failed = next_event(&mut handle, |e| matches!(e, TrackerEvent::SyncFailed { .. })).await;
        assert!(matches!(failed, TrackerEvent::SyncFailed { retained: 2, .. }));

        // No more steps can arrive; the retained delta is still written
        store.set_fail_writes(false);
        let completed = next_event(&mut handle, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
        assert!(matches!(completed, TrackerEvent::SyncCompleted { delta: 2, .. }));

        let persisted = store.records_for("u-1");
        assert_eq!(persisted[0].steps, 2);
        assert!(persisted[0].is_goal_reached);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.unsynced_delta, 0);
        assert_eq!(report.sync.failure_count, 1);
        assert_eq!(report.sync.write_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_goal_event_fires_once() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store, options(Goal::new(1, 0)));
        let mut events = handle.subscribe_events();

        wait_attached(&source).await;
        walk(&source, 10).await;
        // Paused: the rest of the walk is not counted
        walk(&source, 20).await;

        let report = handle.stop().await.unwrap();
        assert_eq!(report.state.steps, 1);
        assert!(report.state.goal_reached);

        let mut reached = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TrackerEvent::GoalReached { .. }) {
                reached += 1;
            }
        }
        assert_eq!(reached, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_virtual_device_detects_but_never_writes() {
        let source = Arc::new(ManualMotionSource::new("simulator").with_virtual_device(true));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options(Goal::default()));

        wait_attached(&source).await;
        walk(&source, 10).await;
        assert_eq!(handle.state().steps, 1);

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(store.write_count(), 0);
        assert_eq!(handle.sync_metrics().skipped_virtual_device(), 1);

        let report = handle.stop().await.unwrap();
        assert_eq!(report.unsynced_delta, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_virtual_device_policy_disables_detection() {
        let source = Arc::new(ManualMotionSource::new("simulator").with_virtual_device(true));
        let store = Arc::new(MemoryStepStore::new());
        let mut opts = options(Goal::default());
        opts.virtual_device_policy = VirtualDevicePolicy::Disabled;

        let mut handle = TrackingSession::spawn(source.clone(), store, opts);
        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::DetectionDisabled { .. })).await;
        assert_eq!(
            event,
            TrackerEvent::DetectionDisabled {
                source_id: "simulator".to_string()
            }
        );
        assert_eq!(source.subscriber_count(), 0);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_sensor_is_reported() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        source.set_available(false);
        let store = Arc::new(MemoryStepStore::new());

        let mut handle = TrackingSession::spawn(source.clone(), store, options(Goal::default()));
        let event = next_event(&mut handle, |e| matches!(e, TrackerEvent::SensorUnavailable { .. })).await;
        assert!(matches!(
            event,
            TrackerEvent::SensorUnavailable { ref source_id, .. } if source_id == "manual"
        ));

        let report = handle.stop().await.unwrap();
        assert_eq!(report.state.steps, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_releases_source_and_reports_unsynced() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options(Goal::default()));

        wait_attached(&source).await;
        walk(&source, 17).await;

        let report = handle.stop().await.unwrap();
        assert_eq!(report.session_steps, 2);
        assert_eq!(report.unsynced_delta, 2);
        assert_eq!(source.subscriber_count(), 0);

        // The cancelled debounce never fires
        sleep(Duration::from_millis(5000)).await;
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_state_watch_closes_after_stop() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source, store, options(Goal::default()));
        let state = handle.watch_state();

        handle.stop().await.unwrap();
        assert!(state.has_changed().is_err());
    }
}
