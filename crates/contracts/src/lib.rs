//! # Contracts
//!
//! Frozen interface contracts shared by every step-tracker crate: data model,
//! collaborator traits and the error taxonomy. Business crates depend on this
//! crate only, never on each other's internals.
//!
//! ## Time Model
//! - Acceleration samples carry no timestamp; they are stamped on arrival by the
//!   tracking session (milliseconds since session start).
//! - Persisted records use wall-clock UTC (`chrono::DateTime<Utc>`), keyed by the
//!   user's local calendar day.

mod activity;
mod blueprint;
mod error;
mod goal;
mod motion_source;
mod profile;
mod range;
mod sample;
mod state;
mod store;

pub use activity::*;
pub use blueprint::*;
pub use error::*;
pub use goal::*;
pub use motion_source::{DeviceProbe, MotionSource, SampleCallback, SubscriptionHandle};
pub use profile::*;
pub use range::*;
pub use sample::*;
pub use state::*;
pub use store::*;
