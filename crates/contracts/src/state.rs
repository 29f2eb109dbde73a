//! Live tracker state and its persisted form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metrics derived from a step count (see `fitness_metrics::compute_metrics`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub kilometers: f64,
    pub calories_burned: f64,
    pub avg_steps_per_hour: f64,
    pub spend_minutes: f64,
}

/// The session's authoritative view, published to the UI layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepTrackerState {
    pub steps: u64,
    pub calories_burned: f64,
    pub kilometers: f64,
    pub walk_sessions: u32,
    pub avg_steps_per_hour: f64,
    pub spend_minutes: f64,
    pub goal_reached: bool,
}

impl StepTrackerState {
    /// Overwrite every derived field
    pub fn apply_metrics(&mut self, metrics: &DerivedMetrics) {
        self.kilometers = metrics.kilometers;
        self.calories_burned = metrics.calories_burned;
        self.avg_steps_per_hour = metrics.avg_steps_per_hour;
        self.spend_minutes = metrics.spend_minutes;
    }

    /// Build the upsert payload for `user_id` at `date`
    pub fn to_record(&self, user_id: impl Into<String>, date: DateTime<Utc>) -> StepRecord {
        StepRecord {
            user_id: user_id.into(),
            date,
            steps: self.steps,
            calories_burned: self.calories_burned,
            kilometers: self.kilometers,
            walk_sessions: self.walk_sessions,
            avg_steps_per_hour: self.avg_steps_per_hour,
            spend_minutes: self.spend_minutes,
            is_goal_reached: self.goal_reached,
        }
    }
}

/// One persisted per-user, per-day step record.
///
/// Field names follow the remote API (camelCase, owner under `user`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    #[serde(rename = "user")]
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub steps: u64,
    #[serde(default)]
    pub calories_burned: f64,
    #[serde(default)]
    pub kilometers: f64,
    #[serde(default)]
    pub walk_sessions: u32,
    #[serde(default)]
    pub avg_steps_per_hour: f64,
    #[serde(default)]
    pub spend_minutes: f64,
    #[serde(default)]
    pub is_goal_reached: bool,
}
