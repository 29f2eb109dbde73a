//! # Sync Coordinator
//!
//! Persists step totals to the remote store without flooding it.
//!
//! - Debounce: every new step reschedules the write to `debounce` after the last step
//! - At most one write in flight; a flush due mid-flight is deferred until it resolves
//! - Writes are skipped when nothing is pending or the device is virtual
//! - Startup reconciliation merges today's persisted record with local progress
//!
//! Store implementations live in [`stores`].

mod coordinator;
mod error;
mod metrics;
mod reconcile;
pub mod stores;

pub use contracts::{StepRecord, StepStore};
pub use coordinator::{FlushOutcome, SyncCoordinator, WriteOutcome};
pub use error::{Result, SyncError};
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use reconcile::{fetch_latest_record, merge_reconciled, Reconciliation};
pub use stores::{HttpStepStore, MemoryStepStore};
