//! Goal evaluation.
//!
//! `BelowGoal -> GoalReached` fires once per session when the daily goal is
//! configured and met. The reached state is terminal until `reset`.

use contracts::Goal;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalState {
    #[default]
    BelowGoal,
    GoalReached,
}

/// The one-shot transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalReached {
    pub steps: u64,
    pub daily_goal: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GoalEvaluator {
    goal: Goal,
    state: GoalState,
}

impl GoalEvaluator {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            state: GoalState::BelowGoal,
        }
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn state(&self) -> GoalState {
        self.state
    }

    pub fn is_reached(&self) -> bool {
        self.state == GoalState::GoalReached
    }

    /// Compare `steps` against the daily goal
    ///
    /// Returns `Some` only on the evaluation that first meets the goal.
    /// Never reverts, even if `steps` later decreases.
    pub fn evaluate(&mut self, steps: u64) -> Option<GoalReached> {
        if self.is_reached() || !self.goal.is_configured() {
            return None;
        }
        if steps < u64::from(self.goal.daily_goal) {
            return None;
        }

        self.state = GoalState::GoalReached;
        info!(steps, daily_goal = self.goal.daily_goal, "daily goal reached");
        Some(GoalReached {
            steps,
            daily_goal: self.goal.daily_goal,
        })
    }

    /// Start over with a new goal
    pub fn reset(&mut self, goal: Goal) {
        self.goal = goal;
        self.state = GoalState::BelowGoal;
    }
}
