//! Windowed-threshold step detection with a refractory period.

use std::sync::Arc;

use contracts::{
    AccelerationSample, ActivityType, ContractError, DetectorConfig, MotionSource,
    SampleCallback, SubscriptionHandle,
};
use nalgebra::Vector3;
use tracing::{debug, instrument, trace};

use crate::window::SlidingWindow;

/// Euclidean norm of a sample
#[inline]
pub fn magnitude(sample: &AccelerationSample) -> f64 {
    Vector3::new(sample.x, sample.y, sample.z).norm()
}

/// Detector tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    pub window_size: usize,
    pub refractory_ms: u64,
    pub activity: ActivityType,
    /// Mean magnitude that must be exceeded
    pub threshold: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            refractory_ms: 300,
            activity: ActivityType::SlowWalking,
            threshold: 10.5,
        }
    }
}

impl DetectorSettings {
    /// Build from config plus the threshold selected for `activity`
    pub fn from_config(config: &DetectorConfig, activity: ActivityType, threshold: f64) -> Self {
        Self {
            window_size: config.window_size,
            refractory_ms: config.refractory_ms,
            activity,
            threshold,
        }
    }
}

/// One accepted step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    /// Timestamp passed to `on_sample`
    pub at_ms: u64,
    /// Window mean that triggered the step
    pub mean_magnitude: f64,
    /// Steps detected by this detector so far
    pub total: u64,
}

/// Live subscription owned by the detector
struct Subscription {
    source: Arc<dyn MotionSource>,
    handle: SubscriptionHandle,
}

/// Step detector
///
/// Owns the magnitude window, the refractory timer and at most one
/// subscription to a motion source. Detaching releases the subscription and
/// clears the window; the step total is never reset.
pub struct StepDetector {
    settings: DetectorSettings,
    window: SlidingWindow,
    last_step_at: Option<u64>,
    steps: u64,
    subscription: Option<Subscription>,
}

impl StepDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            window: SlidingWindow::new(settings.window_size),
            settings,
            last_step_at: None,
            steps: 0,
            subscription: None,
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Steps detected since creation
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Switch activity; takes effect on the next sample
    pub fn set_activity(&mut self, activity: ActivityType, threshold: f64) {
        self.settings.activity = activity;
        self.settings.threshold = threshold;
    }

    /// Feed one sample observed at `now_ms`
    ///
    /// Returns the step event when this sample completes a step. At most one
    /// step is emitted per sample.
    pub fn on_sample(&mut self, sample: AccelerationSample, now_ms: u64) -> Option<StepEvent> {
        self.window.push(magnitude(&sample));

        let mean = self.window.mean()?;
        if mean <= self.settings.threshold {
            return None;
        }

        if let Some(last) = self.last_step_at {
            if now_ms.saturating_sub(last) <= self.settings.refractory_ms {
                trace!(now_ms, last_step_at = last, "step suppressed by refractory period");
                return None;
            }
        }

        self.last_step_at = Some(now_ms);
        self.steps += 1;

        metrics::counter!(
            "step_tracker_steps_detected_total",
            "activity" => self.settings.activity.key()
        )
        .increment(1);
        trace!(now_ms, mean, total = self.steps, "step detected");

        Some(StepEvent {
            at_ms: now_ms,
            mean_magnitude: mean,
            total: self.steps,
        })
    }

    /// Subscribe to `source` with a fresh window
    ///
    /// Attaching while already attached is a no-op.
    ///
    /// # Errors
    /// `ContractError::SensorUnavailable` when the source refuses the subscription.
    #[instrument(name = "step_detector_attach", skip_all, fields(source_id = %source.source_id()))]
    pub fn attach(
        &mut self,
        source: Arc<dyn MotionSource>,
        callback: SampleCallback,
    ) -> Result<(), ContractError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        if !source.is_available() {
            return Err(ContractError::sensor_unavailable(
                source.source_id(),
                "source reports unavailable",
            ));
        }

        self.reset_window();
        let handle = source.subscribe(callback)?;
        debug!(activity = %self.settings.activity, threshold = self.settings.threshold, "detector attached");
        self.subscription = Some(Subscription { source, handle });
        Ok(())
    }

    /// Release the subscription and the window state
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.source.unsubscribe(subscription.handle);
            debug!(source_id = %subscription.source.source_id(), steps = self.steps, "detector detached");
        }
        self.reset_window();
    }

    fn reset_window(&mut self) {
        self.window.clear();
        self.last_step_at = None;
    }
}

impl Drop for StepDetector {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_source::ManualMotionSource;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn slow_walking() -> StepDetector {
        StepDetector::new(DetectorSettings::default())
    }

    fn constant(magnitude: f64) -> AccelerationSample {
        AccelerationSample::new(0.0, 0.0, magnitude)
    }

    /// Feed `count` samples spaced `interval_ms` apart, returning step timestamps
    fn feed(detector: &mut StepDetector, magnitude: f64, count: u64, interval_ms: u64) -> Vec<u64> {
        (0..count)
            .filter_map(|i| detector.on_sample(constant(magnitude), i * interval_ms))
            .map(|step| step.at_ms)
            .collect()
    }

    #[test]
    fn test_magnitude() {
        let sample = AccelerationSample::new(3.0, 4.0, 12.0);
        assert!((magnitude(&sample) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_warm_up_never_emits() {
        let mut detector = slow_walking();
        for i in 0..9 {
            assert!(detector.on_sample(constant(1000.0), i * 1000).is_none());
        }
        assert_eq!(detector.steps(), 0);
    }

    #[test]
    fn test_first_step_after_warm_up() {
        let mut detector = slow_walking();
        let steps = feed(&mut detector, 20.0, 10, 100);
        assert_eq!(steps, vec![900]);
    }

    #[test]
    fn test_below_threshold_never_emits() {
        let mut detector = slow_walking();
        let steps = feed(&mut detector, 10.5, 100, 100);
        assert!(steps.is_empty(), "mean equal to threshold is not a step");
    }

    #[test]
    fn test_constant_stream_one_step_per_refractory_window() {
        // 50ms sampling over 2.5s: warm-up ends at 450ms, then a step every 350ms
        let mut detector = slow_walking();
        let steps = feed(&mut detector, 20.0, 50, 50);
        assert_eq!(steps, vec![450, 800, 1150, 1500, 1850, 2200]);
        assert_eq!(detector.steps(), 6);
    }

    #[test]
    fn test_constant_stream_at_100ms_sampling() {
        // Refractory is strict, so at 100ms spacing steps land 400ms apart
        let mut detector = slow_walking();
        let steps = feed(&mut detector, 20.0, 30, 100);
        assert_eq!(steps, vec![900, 1300, 1700, 2100, 2500, 2900]);
    }

    #[test]
    fn test_refractory_suppression() {
        let mut detector = slow_walking();
        feed(&mut detector, 20.0, 9, 0);

        assert!(detector.on_sample(constant(20.0), 1000).is_some());
        assert!(detector.on_sample(constant(20.0), 1100).is_none());
        assert_eq!(detector.steps(), 1);
    }

    #[test]
    fn test_refractory_boundary_is_exclusive() {
        let mut detector = slow_walking();
        feed(&mut detector, 20.0, 9, 0);

        assert!(detector.on_sample(constant(20.0), 1000).is_some());
        assert!(detector.on_sample(constant(20.0), 1300).is_none());
        assert!(detector.on_sample(constant(20.0), 1301).is_some());
    }

    #[test]
    fn test_single_spike_smoothed_out() {
        let mut detector = slow_walking();
        feed(&mut detector, 9.8, 10, 100);
        // One 20.0 spike lifts the mean to ~10.82 at brisk-walking threshold 11.5
        detector.set_activity(ActivityType::BriskWalking, 11.5);
        assert!(detector.on_sample(constant(20.0), 1100).is_none());
    }

    #[test]
    fn test_noisy_gravity_never_steps() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut detector = slow_walking();

        for i in 0..1000u64 {
            let sample = AccelerationSample::new(
                rng.random_range(-0.3..0.3),
                rng.random_range(-0.3..0.3),
                9.81 + rng.random_range(-0.5..0.5),
            );
            assert!(detector.on_sample(sample, i * 20).is_none());
        }
    }

    #[test]
    fn test_attach_detach_resets_window_not_count() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let mut detector = slow_walking();

        detector
            .attach(source.clone(), Arc::new(|_| {}))
            .unwrap();
        assert!(detector.is_attached());
        assert_eq!(source.subscriber_count(), 1);

        feed(&mut detector, 20.0, 10, 100);
        assert_eq!(detector.steps(), 1);

        detector.detach();
        assert!(!detector.is_attached());
        assert_eq!(source.subscriber_count(), 0);
        assert!(detector.window().is_empty());

        detector
            .attach(source.clone(), Arc::new(|_| {}))
            .unwrap();
        // Nine samples are not enough after reattaching
        for i in 0..9 {
            assert!(detector.on_sample(constant(20.0), 5000 + i * 100).is_none());
        }
        assert!(detector.on_sample(constant(20.0), 6000).is_some());
        assert_eq!(detector.steps(), 2);
    }

    #[test]
    fn test_attach_is_idempotent() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        let mut detector = slow_walking();

        detector.attach(source.clone(), Arc::new(|_| {})).unwrap();
        detector.attach(source.clone(), Arc::new(|_| {})).unwrap();
        assert_eq!(source.subscriber_count(), 1);
    }

    #[test]
    fn test_attach_unavailable_source() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        source.set_available(false);
        let mut detector = slow_walking();

        let result = detector.attach(source.clone(), Arc::new(|_| {}));
        assert!(matches!(result, Err(ContractError::SensorUnavailable { .. })));
        assert!(!detector.is_attached());
    }

    #[test]
    fn test_drop_releases_subscription() {
        let source = Arc::new(ManualMotionSource::new("manual"));
        {
            let mut detector = slow_walking();
            detector.attach(source.clone(), Arc::new(|_| {})).unwrap();
            assert_eq!(source.subscriber_count(), 1);
        }
        assert_eq!(source.subscriber_count(), 0);
    }
}
