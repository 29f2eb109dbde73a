//! # Tracker
//!
//! Tracking session orchestration.
//!
//! One `TrackingSession` task owns the live `StepTrackerState`, the step
//! detector, the goal evaluator and the sync coordinator. Samples, commands,
//! the reconciliation fetch, the debounce timer and the in-flight write are
//! all folded into a single `tokio::select!` loop, so no state is shared.
//!
//! ## Example
//!
//! ```ignore
//! let handle = TrackingSession::spawn(source, store, SessionOptions::from_blueprint(&bp, goal));
//! let mut state = handle.watch_state();
//! state.changed().await?;
//! println!("steps: {}", state.borrow().steps);
//! let report = handle.stop().await?;
//! ```

mod bridge;
mod error;
mod events;
mod goal;
mod session;

pub use contracts::{Goal, StepTrackerState};
pub use error::{Result, SessionError};
pub use events::{SessionReport, TrackerEvent};
pub use goal::{resolve_goal, steps_earlier_this_week};
pub use session::{SessionHandle, SessionOptions, TrackingSession};
