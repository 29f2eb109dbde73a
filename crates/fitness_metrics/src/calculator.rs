//! Step count to physical metrics.
//!
//! ```text
//! step_length_m   = height_cm * step_length_factor / 100
//! kilometers      = steps * step_length_m / 1000
//! calories_burned = (met * 3.5 * weight_kg / 200) * (steps / 120)
//! avg_steps/hour  = steps / max(elapsed_minutes / 60, 1)   (FloorOneHour)
//!                 = steps / 24                             (FlatDay)
//! ```
//!
//! Non-positive or non-finite inputs produce zeros, never NaN or infinity.

use contracts::{
    ActivityProfile, ActivityTable, DerivedMetrics, HourlyRateBasis, UserPhysicalProfile,
};

/// Oxygen uptake per MET (ml/kg/min)
pub const MET_OXYGEN_FACTOR: f64 = 3.5;

/// Steps per calorie-formula unit (one minute of walking)
pub const CALORIE_STEPS_PER_UNIT: f64 = 120.0;

const HOURS_PER_DAY: f64 = 24.0;

#[inline]
fn positive(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Derive metrics for `steps`
///
/// Deterministic: identical inputs always yield identical output.
pub fn compute_metrics(
    steps: u64,
    profile: &UserPhysicalProfile,
    activity: &ActivityProfile,
    elapsed_minutes: f64,
    basis: HourlyRateBasis,
) -> DerivedMetrics {
    let steps_f = steps as f64;

    let kilometers = match (positive(profile.height_cm), positive(activity.step_length_factor)) {
        (Some(height), Some(factor)) => steps_f * (height * factor / 100.0) / 1000.0,
        _ => 0.0,
    };

    let calories_burned = match (positive(profile.weight_kg), positive(activity.met_value)) {
        (Some(weight), Some(met)) => {
            (met * MET_OXYGEN_FACTOR * weight / 200.0) * (steps_f / CALORIE_STEPS_PER_UNIT)
        }
        _ => 0.0,
    };

    let spend_minutes = positive(elapsed_minutes).unwrap_or(0.0);

    let avg_steps_per_hour = match basis {
        HourlyRateBasis::FloorOneHour => steps_f / (spend_minutes / 60.0).max(1.0),
        HourlyRateBasis::FlatDay => steps_f / HOURS_PER_DAY,
    };

    DerivedMetrics {
        kilometers,
        calories_burned,
        avg_steps_per_hour,
        spend_minutes,
    }
}

/// Calculator bound to an activity table and rate basis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsCalculator {
    activities: ActivityTable,
    basis: HourlyRateBasis,
}

impl MetricsCalculator {
    pub fn new(activities: ActivityTable, basis: HourlyRateBasis) -> Self {
        Self { activities, basis }
    }

    pub fn basis(&self) -> HourlyRateBasis {
        self.basis
    }

    pub fn activities(&self) -> &ActivityTable {
        &self.activities
    }

    /// Metrics for the profile's selected activity
    pub fn compute(
        &self,
        steps: u64,
        profile: &UserPhysicalProfile,
        elapsed_minutes: f64,
    ) -> DerivedMetrics {
        compute_metrics(
            steps,
            profile,
            self.activities.get(profile.activity),
            elapsed_minutes,
            self.basis,
        )
    }
}
