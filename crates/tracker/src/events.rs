//! Session notifications and the final report.

use std::time::Duration;

use contracts::{Goal, StepTrackerState};
use serde::Serialize;
use sync_coordinator::SyncMetricsSnapshot;

/// Non-fatal notifications for the UI layer
///
/// Collaborator failures surface here instead of as errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    /// Today's persisted record was merged in
    Reconciled { remote_steps: u64, merged_steps: u64 },
    /// The reconciliation fetch failed; the session continues from local state
    ReconciliationFailed { message: String },
    /// One step detected (`at_ms` since session start)
    StepDetected { steps: u64, at_ms: u64 },
    /// One-shot: the daily goal was met
    GoalReached { steps: u64, daily_goal: u32 },
    /// Detection could not start
    SensorUnavailable { source_id: String, reason: String },
    /// Virtual device with detection disabled
    DetectionDisabled { source_id: String },
    SyncCompleted { delta: u64, latency_ms: u64 },
    /// The write failed; `retained` steps stay pending
    SyncFailed { message: String, retained: u64 },
}

/// Summary returned when a session stops
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub state: StepTrackerState,
    /// Steps detected during this session
    pub session_steps: u64,
    /// Steps never confirmed persisted
    pub unsynced_delta: u64,
    pub sync: SyncMetricsSnapshot,
    pub dropped_samples: u64,
    pub goal: Goal,
    pub elapsed: Duration,
}
