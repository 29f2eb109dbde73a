//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! - Contract snapshots (config and event formats)
//! - Session e2e over manual and mock sources, no backend required

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ActivityType, Goal, TrackerBlueprint, UserPhysicalProfile};
    use tracker::TrackerEvent;

    #[test]
    fn test_blueprint_survives_toml_export() {
        let blueprint = TrackerBlueprint {
            profile: Some(UserPhysicalProfile {
                weight_kg: 62.5,
                height_cm: 168.0,
                age_years: 41,
                activity: ActivityType::Jogging,
                ..UserPhysicalProfile::default()
            }),
            goal: Some(Goal::new(9000, 60000)),
            ..TrackerBlueprint::default()
        };

        let exported = ConfigLoader::to_toml(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&exported, ConfigFormat::Toml).unwrap();
        assert_eq!(reloaded, blueprint);
    }

    #[test]
    fn test_event_json_shape() {
        let event = TrackerEvent::StepDetected {
            steps: 1,
            at_ms: 450,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "event": "step_detected", "steps": 1, "at_ms": 450 })
        );

        let event = TrackerEvent::SyncFailed {
            message: "offline".to_string(),
            retained: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "sync_failed");
        assert_eq!(json["retained"], 3);
    }

    #[test]
    fn test_step_record_wire_names() {
        let state = contracts::StepTrackerState {
            steps: 1200,
            walk_sessions: 2,
            goal_reached: true,
            ..Default::default()
        };
        let record = state.to_record("u-1", chrono::Utc::now());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["user"], "u-1");
        assert_eq!(json["steps"], 1200);
        assert_eq!(json["walkSessions"], 2);
        assert_eq!(json["isGoalReached"], true);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{Goal, MotionSource, UserPhysicalProfile};
    use fitness_metrics::{compute_metrics, daily_progress_percent};
    use motion_source::{ManualMotionSource, MockMotionSource, MockMotionSourceConfig};
    use sync_coordinator::MemoryStepStore;
    use tokio::sync::broadcast;
    use tokio::time::{sleep, timeout};
    use tracker::{SessionHandle, SessionOptions, TrackerEvent, TrackingSession};

    const TICK: Duration = Duration::from_millis(50);

    fn options(user_id: &str, goal: Goal) -> SessionOptions {
        SessionOptions {
            user_id: user_id.to_string(),
            goal,
            profile: UserPhysicalProfile {
                weight_kg: 70.0,
                height_cm: 175.0,
                age_years: 30,
                ..UserPhysicalProfile::default()
            },
            ..SessionOptions::default()
        }
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

    async fn walk(source: &ManualMotionSource, samples: usize) {
        for _ in 0..samples {
            source.emit_magnitude(20.0);
            sleep(TICK).await;
        }
    }

    async fn wait_for<F>(events: &mut broadcast::Receiver<TrackerEvent>, matches: F) -> TrackerEvent
    where
        F: Fn(&TrackerEvent) -> bool,
    {
        timeout(Duration::from_secs(30), async {
            loop {
                let event = events.recv().await.expect("session closed");
                if matches(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("event never arrived")
    }

    async fn flush_and_wait(handle: &SessionHandle, events: &mut broadcast::Receiver<TrackerEvent>) {
        handle.flush().await.unwrap();
        wait_for(events, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
    }

    /// Manual source -> detector -> debounced write, six steps at 50 ms sampling
    #[tokio::test(start_paused = true)]
    async fn test_e2e_six_steps_one_write() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options("u-1", Goal::default()));
        let mut events = handle.subscribe_events();

        wait_attached(&source).await;
        walk(&source, 45).await;

        let completed = wait_for(&mut events, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
        assert!(matches!(completed, TrackerEvent::SyncCompleted { delta: 6, .. }));

        let report = handle.stop().await.unwrap();
        assert_eq!(report.state.steps, 6);
        assert_eq!(report.unsynced_delta, 0);

        let log = store.write_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].steps, 6);
        // 175 cm x 0.45 brisk walking factor per step
        assert!((log[0].kilometers - 6.0 * 175.0 * 0.45 / 100.0 / 1000.0).abs() < 1e-9);
        assert_eq!(log[0].walk_sessions, 1);

        // Persisted distance and calories match the pure calculator
        let opts = options("u-1", Goal::default());
        let expected = compute_metrics(
            6,
            &opts.profile,
            opts.activities.get(opts.profile.activity),
            0.0,
            opts.hourly_rate_basis,
        );
        assert!((log[0].kilometers - expected.kilometers).abs() < 1e-12);
        assert!((log[0].calories_burned - expected.calories_burned).abs() < 1e-12);
        assert!(log[0].calories_burned > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_e2e_step_timestamps() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store, options("u-1", Goal::default()));
        let mut events = handle.subscribe_events();

        wait_attached(&source).await;
        walk(&source, 45).await;
        handle.stop().await.unwrap();

        let mut step_times = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let TrackerEvent::StepDetected { at_ms, .. } = event {
                step_times.push(at_ms);
            }
        }
        assert_eq!(step_times, vec![450, 800, 1150, 1500, 1850, 2200]);
    }

    /// A second session on the same day resumes from the persisted total
    #[tokio::test(start_paused = true)]
    async fn test_e2e_resume_after_restart() {
        let store = Arc::new(MemoryStepStore::new());

        let source = Arc::new(ManualMotionSource::new("manual"));
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options("u-2", Goal::default()));
        let mut events = handle.subscribe_events();
        wait_attached(&source).await;
        walk(&source, 24).await;
        flush_and_wait(&handle, &mut events).await;
        let first = handle.stop().await.unwrap();
        assert_eq!(first.state.steps, 3);

        let source = Arc::new(ManualMotionSource::new("manual"));
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options("u-2", Goal::default()));
        let mut events = handle.subscribe_events();
        let reconciled = wait_for(&mut events, |e| matches!(e, TrackerEvent::Reconciled { .. })).await;
        assert_eq!(
            reconciled,
            TrackerEvent::Reconciled {
                remote_steps: 3,
                merged_steps: 3
            }
        );

        wait_attached(&source).await;
        walk(&source, 10).await;
        flush_and_wait(&handle, &mut events).await;
        let second = handle.stop().await.unwrap();

        assert_eq!(second.state.steps, 4);
        assert_eq!(second.session_steps, 1);
        let records = store.records_for("u-2");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].steps, 4);
        assert_eq!(records[0].walk_sessions, 2);
    }

    /// A failed write keeps its delta; the next cycle persists everything
    #[tokio::test(start_paused = true)]
    async fn test_e2e_failed_write_is_retried() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        store.set_fail_writes(true);
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options("u-3", Goal::default()));
        let mut events = handle.subscribe_events();

        wait_attached(&source).await;
        walk(&source, 10).await;
        let failed = wait_for(&mut events, |e| matches!(e, TrackerEvent::SyncFailed { .. })).await;
        assert!(matches!(failed, TrackerEvent::SyncFailed { retained: 1, .. }));

        store.set_fail_writes(false);
        walk(&source, 7).await;
        let completed = wait_for(&mut events, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;
        assert!(matches!(completed, TrackerEvent::SyncCompleted { delta: 2, .. }));

        let report = handle.stop().await.unwrap();
        assert_eq!(report.sync.failure_count, 1);
        assert_eq!(report.sync.write_count, 1);
        assert_eq!(store.records_for("u-3")[0].steps, 2);
    }

    /// Goal reached mid-walk: one event, detection paused, total persisted
    #[tokio::test(start_paused = true)]
    async fn test_e2e_goal_reached_is_persisted() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store.clone(), options("u-4", Goal::new(3, 0)));
        let mut events = handle.subscribe_events();

        wait_attached(&source).await;
        walk(&source, 40).await;
        wait_for(&mut events, |e| matches!(e, TrackerEvent::SyncCompleted { .. })).await;

        let report = handle.stop().await.unwrap();
        assert_eq!(report.state.steps, 3);
        assert!(report.state.goal_reached);

        let record = &store.records_for("u-4")[0];
        assert_eq!(record.steps, 3);
        assert!(record.is_goal_reached);
        assert_eq!(daily_progress_percent(&report.goal, record.steps), 100.0);
    }

    /// Real clock, synthetic gait thread
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_source_walks() {
        let source = Arc::new(MockMotionSource::new(
            "mock",
            MockMotionSourceConfig {
                cadence_spm: 120.0,
                ..MockMotionSourceConfig::for_threshold(11.5)
            },
        ));
        let store = Arc::new(MemoryStepStore::new());
        let handle = TrackingSession::spawn(source.clone(), store, options("u-5", Goal::default()));

        sleep(Duration::from_millis(2500)).await;
        assert!(source.is_running());

        let report = handle.stop().await.unwrap();
        assert!(report.state.steps >= 1, "no steps detected: {report:?}");
        assert!(!source.is_running());
        assert_eq!(source.subscriber_count(), 0);
    }
}
