//! Goal progress percentages, clamped to `[0, 100]`.

use contracts::Goal;

fn percent(steps: u64, target: u32) -> f64 {
    if target == 0 {
        return 0.0;
    }
    (steps as f64 / f64::from(target) * 100.0).clamp(0.0, 100.0)
}

/// Today's steps against the daily goal
pub fn daily_progress_percent(goal: &Goal, steps: u64) -> f64 {
    percent(steps, goal.daily_goal)
}

/// This week's steps against the weekly goal
pub fn weekly_progress_percent(goal: &Goal, weekly_steps: u64) -> f64 {
    percent(weekly_steps, goal.weekly_goal)
}
