//! Mock motion source
//!
//! Generates a synthetic walking waveform on a background thread: gravity on
//! the z axis plus a sinusoid at the configured cadence. The generator runs
//! only while at least one subscriber is registered.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{
    AccelerationSample, ContractError, DeviceProbe, MotionSource, SampleCallback,
    SubscriptionHandle,
};
use tracing::{debug, trace};

use crate::registry::Subscribers;

const GRAVITY: f64 = 9.81;

/// Mean of a half-sine lobe sampled over a short window, relative to its peak
const WINDOW_MEAN_RATIO: f64 = 0.75;

/// Mock source configuration
#[derive(Debug, Clone)]
pub struct MockMotionSourceConfig {
    /// Sample rate (Hz)
    pub sample_rate_hz: f64,
    /// Steps per minute encoded in the waveform
    pub cadence_spm: f64,
    /// Peak deviation from gravity
    pub amplitude: f64,
    /// Report as a simulator
    pub virtual_device: bool,
}

impl Default for MockMotionSourceConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50.0,
            cadence_spm: 110.0,
            amplitude: 4.0,
            virtual_device: false,
        }
    }
}

impl MockMotionSourceConfig {
    /// Amplitude large enough for the windowed mean to clear `threshold`
    pub fn for_threshold(threshold: f64) -> Self {
        let amplitude = ((threshold - GRAVITY) / WINDOW_MEAN_RATIO + 1.5).max(2.0);
        Self {
            amplitude,
            ..Self::default()
        }
    }
}

/// Synthetic gait generator
pub struct MockMotionSource {
    source_id: String,
    config: MockMotionSourceConfig,
    subscribers: Arc<Subscribers>,
    /// Bumped on every start/stop; a generator thread exits when it no longer owns the current value
    generation: Arc<AtomicU64>,
    running: AtomicBool,
}

impl MockMotionSource {
    /// Create new mock source
    pub fn new(source_id: impl Into<String>, config: MockMotionSourceConfig) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            subscribers: Arc::new(Subscribers::default()),
            generation: Arc::new(AtomicU64::new(0)),
            running: AtomicBool::new(false),
        }
    }

    /// Create mock source with default configuration
    pub fn with_defaults(source_id: impl Into<String>) -> Self {
        Self::new(source_id, MockMotionSourceConfig::default())
    }

    /// Whether the generator thread is active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Waveform value at `elapsed_s`
    fn sample_at(config: &MockMotionSourceConfig, elapsed_s: f64) -> AccelerationSample {
        let frequency = config.cadence_spm / 60.0;
        let phase = TAU * frequency * elapsed_s;
        AccelerationSample::new(
            0.3 * phase.cos(),
            0.2 * (2.0 * phase).sin(),
            GRAVITY + config.amplitude * phase.sin(),
        )
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let subscribers = self.subscribers.clone();
        let config = self.config.clone();
        let source_id = self.source_id.clone();
        let interval = Duration::from_secs_f64(1.0 / config.sample_rate_hz.max(1.0));

        thread::spawn(move || {
            let start_time = Instant::now();
            let mut sample_count: u64 = 0;

            debug!(
                source_id = %source_id,
                sample_rate_hz = config.sample_rate_hz,
                cadence_spm = config.cadence_spm,
                "mock motion source started"
            );

            while generation.load(Ordering::SeqCst) == my_generation {
                let sample = Self::sample_at(&config, start_time.elapsed().as_secs_f64());
                subscribers.dispatch(sample);
                sample_count += 1;

                trace!(source_id = %source_id, sample_count, "mock sample sent");
                thread::sleep(interval);
            }

            debug!(source_id = %source_id, sample_count, "mock motion source stopped");
        });
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockMotionSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl DeviceProbe for MockMotionSource {
    fn is_virtual_device(&self) -> bool {
        self.config.virtual_device
    }
}

impl MotionSource for MockMotionSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn is_available(&self) -> bool {
        true
    }

    fn subscribe(&self, callback: SampleCallback) -> Result<SubscriptionHandle, ContractError> {
        let (handle, count) = self.subscribers.insert(callback);
        debug!(source_id = %self.source_id, subscribers = count, "subscribed");
        self.start();
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(remaining) = self.subscribers.remove(handle) {
            debug!(source_id = %self.source_id, subscribers = remaining, "unsubscribed");
            if remaining == 0 {
                self.stop();
            }
        }
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
