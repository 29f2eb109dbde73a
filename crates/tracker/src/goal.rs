//! Goal lookup and weekly totals.

use chrono::{Local, NaiveDate};
use contracts::{DayRange, Goal, StepQuery, StepStore};
use tracing::{debug, info, warn};

/// Pick the goal for a session
///
/// A configured goal wins; otherwise the store is asked. Lookup failures mean
/// "no goal", which disables goal evaluation without stopping tracking.
pub async fn resolve_goal<S>(store: &S, user_id: &str, configured: Option<Goal>) -> Goal
where
    S: StepStore + ?Sized,
{
    if let Some(goal) = configured.filter(Goal::is_configured) {
        return goal;
    }

    match store.fetch_goal(user_id).await {
        Ok(Some(goal)) => {
            info!(user_id, daily_goal = goal.daily_goal, weekly_goal = goal.weekly_goal, "goal loaded");
            goal
        }
        Ok(None) => {
            info!(user_id, "no goal configured");
            Goal::default()
        }
        Err(e) => {
            warn!(user_id, error = %e, "goal lookup failed, continuing without goal");
            Goal::default()
        }
    }
}

/// Steps persisted earlier in the Sunday-start week containing `today`
///
/// Today's record is left out; the live session owns that count. `None` when
/// the lookup fails.
pub async fn steps_earlier_this_week<S>(store: &S, user_id: &str, today: NaiveDate) -> Option<u64>
where
    S: StepStore + ?Sized,
{
    let query = StepQuery::new(user_id, DayRange::week_of(today));
    match store.fetch_steps(&query).await {
        Ok(records) => {
            let steps: u64 = records
                .iter()
                .filter(|r| r.date.with_timezone(&Local).date_naive() != today)
                .map(|r| r.steps)
                .sum();
            debug!(user_id, days = records.len(), steps, "weekly steps loaded");
            Some(steps)
        }
        Err(e) => {
            warn!(user_id, error = %e, "weekly steps lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_coordinator::MemoryStepStore;

    #[tokio::test]
    async fn test_configured_goal_wins() {
        let store = MemoryStepStore::new();
        store.set_goal("u-1", Goal::new(5000, 0));

        let goal = resolve_goal(&store, "u-1", Some(Goal::new(9000, 0))).await;
        assert_eq!(goal.daily_goal, 9000);
    }

    #[tokio::test]
    async fn test_unset_config_falls_back_to_store() {
        let store = MemoryStepStore::new();
        store.set_goal("u-1", Goal::new(5000, 35000));

        let goal = resolve_goal(&store, "u-1", Some(Goal::default())).await;
        assert_eq!(goal, Goal::new(5000, 35000));
    }

    #[tokio::test]
    async fn test_lookup_failure_means_no_goal() {
        let store = MemoryStepStore::new();
        store.set_fail_reads(true);

        let goal = resolve_goal(&store, "u-1", None).await;
        assert!(!goal.is_configured());
    }

    #[tokio::test]
    async fn test_earlier_this_week_skips_today_and_other_weeks() {
        use chrono::{Duration, TimeZone, Weekday};
        use contracts::StepTrackerState;

        // A Wednesday, so the week has earlier days
        let today = NaiveDate::from_isoywd_opt(2025, 10, Weekday::Wed).unwrap();
        let at_noon = |date: NaiveDate| {
            Local
                .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
                .unwrap()
                .with_timezone(&chrono::Utc)
        };
        let record = |steps: u64, date: NaiveDate| {
            StepTrackerState {
                steps,
                ..StepTrackerState::default()
            }
            .to_record("u-1", at_noon(date))
        };

        let store = MemoryStepStore::new();
        store.insert_record(record(1000, today - Duration::days(2)));
        store.insert_record(record(2500, today - Duration::days(1)));
        store.insert_record(record(400, today));
        store.insert_record(record(9999, today - Duration::days(7)));

        let steps = steps_earlier_this_week(&store, "u-1", today).await;
        assert_eq!(steps, Some(3500));
    }

    #[tokio::test]
    async fn test_earlier_this_week_failure_is_none() {
        let store = MemoryStepStore::new();
        store.set_fail_reads(true);

        let today = Local::now().date_naive();
        assert_eq!(steps_earlier_this_week(&store, "u-1", today).await, None);
    }
}
