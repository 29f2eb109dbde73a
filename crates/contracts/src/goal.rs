//! Step goals.

use serde::{Deserialize, Serialize};

/// Daily/weekly step targets.
///
/// A zero daily goal means "no goal configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub daily_goal: u32,
    #[serde(default)]
    pub weekly_goal: u32,
}

impl Goal {
    pub const fn new(daily_goal: u32, weekly_goal: u32) -> Self {
        Self {
            daily_goal,
            weekly_goal,
        }
    }

    /// A daily goal is set, so goal-reached evaluation applies
    pub fn is_configured(&self) -> bool {
        self.daily_goal > 0
    }

    /// Both daily and weekly goals are set
    pub fn is_complete(&self) -> bool {
        self.daily_goal > 0 && self.weekly_goal > 0
    }
}
