//! Activity profiles: per-activity detection threshold and metric factors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of activity types a user can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    SlowWalking,
    #[default]
    BriskWalking,
    Jogging,
    Running,
}

impl ActivityType {
    /// All activity types, slowest first.
    pub const ALL: [ActivityType; 4] = [
        Self::SlowWalking,
        Self::BriskWalking,
        Self::Jogging,
        Self::Running,
    ];

    /// Human-readable label, as shown to users and stored remotely.
    pub fn label(self) -> &'static str {
        match self {
            Self::SlowWalking => "Slow walking",
            Self::BriskWalking => "Brisk walking",
            Self::Jogging => "Jogging",
            Self::Running => "Running",
        }
    }

    /// Config key (`slow_walking`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Self::SlowWalking => "slow_walking",
            Self::BriskWalking => "brisk_walking",
            Self::Jogging => "jogging",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    /// Accepts labels ("Brisk walking") and keys ("brisk_walking", "brisk-walking").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|a| a.key() == normalized)
            .ok_or_else(|| format!("unknown activity type '{s}'"))
    }
}

/// Tunable parameters of one activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityProfile {
    /// Mean window magnitude above which a step may be emitted
    pub threshold: f64,
    /// Step length as a fraction of body height
    pub step_length_factor: f64,
    /// Metabolic equivalent of task
    pub met_value: f64,
}

impl ActivityProfile {
    pub const fn new(threshold: f64, step_length_factor: f64, met_value: f64) -> Self {
        Self {
            threshold,
            step_length_factor,
            met_value,
        }
    }
}

/// Configuration table mapping every `ActivityType` to its profile.
///
/// Thresholds are data, not code: a config file can retune any row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTable {
    #[serde(default = "default_slow_walking")]
    pub slow_walking: ActivityProfile,
    #[serde(default = "default_brisk_walking")]
    pub brisk_walking: ActivityProfile,
    #[serde(default = "default_jogging")]
    pub jogging: ActivityProfile,
    #[serde(default = "default_running")]
    pub running: ActivityProfile,
}

fn default_slow_walking() -> ActivityProfile {
    ActivityProfile::new(10.5, 0.35, 3.0)
}

fn default_brisk_walking() -> ActivityProfile {
    ActivityProfile::new(11.5, 0.45, 3.8)
}

fn default_jogging() -> ActivityProfile {
    ActivityProfile::new(13.0, 0.65, 7.0)
}

fn default_running() -> ActivityProfile {
    ActivityProfile::new(15.0, 0.75, 10.0)
}

impl Default for ActivityTable {
    fn default() -> Self {
        Self {
            slow_walking: default_slow_walking(),
            brisk_walking: default_brisk_walking(),
            jogging: default_jogging(),
            running: default_running(),
        }
    }
}

impl ActivityTable {
    /// Look up the profile for an activity
    pub fn get(&self, activity: ActivityType) -> &ActivityProfile {
        match activity {
            ActivityType::SlowWalking => &self.slow_walking,
            ActivityType::BriskWalking => &self.brisk_walking,
            ActivityType::Jogging => &self.jogging,
            ActivityType::Running => &self.running,
        }
    }

    /// Iterate rows slowest first
    pub fn iter(&self) -> impl Iterator<Item = (ActivityType, &ActivityProfile)> {
        ActivityType::ALL.into_iter().map(move |a| (a, self.get(a)))
    }
}
