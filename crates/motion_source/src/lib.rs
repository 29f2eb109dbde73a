//! # Motion Source
//!
//! Accelerometer stream adapters implementing `MotionSource`.
//!
//! - `ManualMotionSource`: samples pushed programmatically (tests, embedding hosts)
//! - `MockMotionSource`: synthetic gait waveform generated on a background thread
//! - `ReplayMotionSource`: replays a recorded JSONL trace with original timing

pub mod error;
pub mod manual;
pub mod mock;
mod registry;
pub mod replay;

pub use contracts::{AccelerationSample, DeviceProbe, MotionSource, SampleCallback};
pub use error::{MotionSourceError, Result};
pub use manual::ManualMotionSource;
pub use mock::{MockMotionSource, MockMotionSourceConfig};
pub use replay::{ReplayConfig, ReplayMotionSource, ReplayRecord};
