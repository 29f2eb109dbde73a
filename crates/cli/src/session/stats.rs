//! Run statistics.

use std::time::Duration;

use observability::SessionSummary;
use tracker::SessionReport;

/// Statistics from a finished run
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Final session state and sync counters
    pub report: SessionReport,

    /// Aggregated step and write statistics
    pub summary: SessionSummary,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Steps this week including today, when a weekly goal is set
    pub weekly_steps: Option<u64>,
}

impl RunStats {
    /// Goal progress in percent
    pub fn goal_progress(&self) -> f64 {
        fitness_metrics::daily_progress_percent(&self.report.goal, self.report.state.steps)
    }

    /// Weekly goal progress in percent, when the week's steps are known
    pub fn weekly_progress(&self) -> Option<f64> {
        self.weekly_steps
            .map(|steps| fitness_metrics::weekly_progress_percent(&self.report.goal, steps))
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let state = &self.report.state;
        let sync = &self.report.sync;

        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Session Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Today");
        println!("   ├─ Steps: {}", state.steps);
        println!("   ├─ Distance: {:.3} km", state.kilometers);
        println!("   ├─ Calories: {:.1} kcal", state.calories_burned);
        println!("   ├─ Pace: {:.0} steps/h", state.avg_steps_per_hour);
        println!("   ├─ Active time: {:.1} min", state.spend_minutes);
        println!("   └─ Walk sessions: {}", state.walk_sessions);

        println!("\n🎯 Goal");
        if self.report.goal.is_configured() {
            println!(
                "   ├─ Daily goal: {} ({:.0}%)",
                self.report.goal.daily_goal,
                self.goal_progress()
            );
            println!(
                "   ├─ Reached: {}",
                if state.goal_reached { "yes" } else { "no" }
            );
        } else {
            println!("   ├─ No daily goal");
        }
        match (self.weekly_steps, self.weekly_progress()) {
            (Some(steps), Some(progress)) => println!(
                "   └─ This week: {} / {} ({:.0}%)",
                steps, self.report.goal.weekly_goal, progress
            ),
            _ => println!("   └─ No weekly total"),
        }

        println!("\n📈 This Session");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Steps detected: {}", self.report.session_steps);
        println!("   ├─ Cadence: {:.1} steps/min", self.summary.cadence_spm);
        println!("   ├─ Step interval (ms): {}", self.summary.step_interval_ms);
        println!("   └─ Dropped samples: {}", self.report.dropped_samples);

        println!("\n☁️  Sync");
        println!("   ├─ Writes: {} ok, {} failed", sync.write_count, sync.failure_count);
        println!("   ├─ Write latency (ms): {}", self.summary.write_latency_ms);
        println!(
            "   ├─ Skipped: {} idle, {} virtual device, {} deferred",
            sync.skipped_no_delta, sync.skipped_virtual_device, sync.deferred_count
        );
        println!("   └─ Unsynced steps: {}", self.report.unsynced_delta);

        println!();
    }
}
