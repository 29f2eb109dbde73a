//! Raw motion samples.

use serde::{Deserialize, Serialize};

/// One 3-axis accelerometer reading in device acceleration units.
///
/// Samples are ephemeral: the step detector consumes and discards them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AccelerationSample {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
