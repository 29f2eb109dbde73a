//! Calendar ranges used to query persisted steps.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Inclusive UTC instant range covering local calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayRange {
    /// Start-of-day to end-of-day (inclusive, millisecond precision) for a local date
    pub fn for_local_date(date: NaiveDate) -> Self {
        Self {
            start: local_start_of(date),
            end: local_end_of(date),
        }
    }

    /// The local calendar day containing now
    pub fn today() -> Self {
        Self::for_local_date(Local::now().date_naive())
    }

    /// Sunday-to-Saturday week containing `date`
    pub fn week_of(date: NaiveDate) -> Self {
        let week = date.week(Weekday::Sun);
        Self {
            start: local_start_of(week.first_day()),
            end: local_end_of(week.last_day()),
        }
    }

    /// Whether `instant` falls inside the range
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn local_start_of(date: NaiveDate) -> DateTime<Utc> {
    to_utc(date.and_hms_opt(0, 0, 0).unwrap_or_default(), true)
}

fn local_end_of(date: NaiveDate) -> DateTime<Utc> {
    to_utc(
        date.and_hms_milli_opt(23, 59, 59, 999).unwrap_or_default(),
        false,
    )
}

/// Resolve a local wall-clock time, picking the earliest/latest mapping across DST folds.
fn to_utc(naive: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let mapped = naive.and_local_timezone(Local);
    let resolved = if earliest {
        mapped.earliest()
    } else {
        mapped.latest()
    };
    resolved
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// Query for one user's records in a range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepQuery {
    pub user_id: String,
    pub range: DayRange,
}

impl StepQuery {
    pub fn new(user_id: impl Into<String>, range: DayRange) -> Self {
        Self {
            user_id: user_id.into(),
            range,
        }
    }

    /// Today's records for `user_id`
    pub fn today(user_id: impl Into<String>) -> Self {
        Self::new(user_id, DayRange::today())
    }
}
