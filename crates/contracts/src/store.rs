//! StepStore trait - remote persistence interface
//!
//! The core reads today's record on startup, upserts accumulated totals and
//! reads the user's goal. Implementations live in `sync_coordinator`.

use crate::{ContractError, Goal, StepQuery, StepRecord};

/// Remote step persistence
///
/// All implementations must be upsert-keyed by user + local calendar day.
#[trait_variant::make(StepStore: Send)]
pub trait LocalStepStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Records for a user in a range, ordered by date ascending
    async fn fetch_steps(&self, query: &StepQuery) -> Result<Vec<StepRecord>, ContractError>;

    /// Create the record for `record.user_id` + day of `record.date`, or replace it
    async fn upsert_steps(&self, record: &StepRecord) -> Result<(), ContractError>;

    /// The user's goal, `None` when never configured
    async fn fetch_goal(&self, user_id: &str) -> Result<Option<Goal>, ContractError>;
}
