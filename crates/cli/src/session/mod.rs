//! Session runner: builds collaborators from config and drives one session.

mod runner;
mod stats;

pub use runner::{RunnerConfig, SessionRunner};
pub use stats::RunStats;
