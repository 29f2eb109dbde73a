//! Startup reconciliation with persisted steps.

use contracts::{ContractError, StepQuery, StepRecord, StepStore, StepTrackerState};
use tracing::debug;

/// Today's most recent persisted record
///
/// Records come back ordered by date; the last one is the current total.
pub async fn fetch_latest_record<S>(
    store: &S,
    query: &StepQuery,
) -> Result<Option<StepRecord>, ContractError>
where
    S: StepStore + ?Sized,
{
    let records = store.fetch_steps(query).await?;
    debug!(store = %store.name(), count = records.len(), "reconciliation fetch");
    Ok(records.into_iter().last())
}

/// Merged state plus the persisted baselines the session builds on
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Merged counts; derived fields still need recomputing
    pub state: StepTrackerState,
    /// Active minutes already persisted today
    pub base_spend_minutes: f64,
    /// Whether the remote count replaced the local one
    pub adopted_remote: bool,
}

/// Merge a persisted record into local state
///
/// With no steps detected this session the record is adopted as is.
/// Otherwise the larger count wins, so progress never regresses and the two
/// counts are never summed.
pub fn merge_reconciled(
    local: &StepTrackerState,
    session_steps: u64,
    record: &StepRecord,
) -> Reconciliation {
    let mut state = local.clone();

    if session_steps == 0 {
        state.steps = record.steps;
        state.walk_sessions = record.walk_sessions;
    } else {
        state.steps = record.steps.max(local.steps);
        state.walk_sessions = record
            .walk_sessions
            .saturating_add(1)
            .max(local.walk_sessions);
    }

    let base_spend_minutes = if record.spend_minutes.is_finite() && record.spend_minutes > 0.0 {
        record.spend_minutes
    } else {
        0.0
    };

    Reconciliation {
        adopted_remote: state.steps == record.steps && record.steps > local.steps,
        state,
        base_spend_minutes,
    }
}
