//! # Fitness Metrics
//!
//! Pure derivations from a step count plus goal tracking.
//!
//! - `compute_metrics`: distance, calories, hourly rate and active minutes
//! - `GoalEvaluator`: one-shot "goal reached" transition per session
//! - `daily_progress_percent` / `weekly_progress_percent`

mod calculator;
mod goal;
mod progress;

pub use calculator::{compute_metrics, MetricsCalculator, CALORIE_STEPS_PER_UNIT, MET_OXYGEN_FACTOR};
pub use contracts::{DerivedMetrics, HourlyRateBasis};
pub use goal::{GoalEvaluator, GoalReached, GoalState};
pub use progress::{daily_progress_percent, weekly_progress_percent};
