//! # Step Detector
//!
//! Turns a noisy accelerometer stream into discrete steps.
//!
//! Each sample's magnitude enters a fixed-size sliding window. Once the window
//! is full, a step is emitted when the window mean exceeds the activity
//! threshold and the refractory period since the previous step has elapsed.
//!
//! ## Example
//!
//! ```ignore
//! use step_detector::{DetectorSettings, StepDetector};
//!
//! let mut detector = StepDetector::new(DetectorSettings::default());
//! if let Some(step) = detector.on_sample(sample, now_ms) {
//!     println!("step at {}ms", step.at_ms);
//! }
//! ```

mod detector;
mod window;

pub use detector::{magnitude, DetectorSettings, StepDetector, StepEvent};
pub use window::SlidingWindow;
