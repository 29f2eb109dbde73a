//! Manually driven motion source
//!
//! Samples are pushed by the caller with `emit`, and callbacks run
//! synchronously on the caller's thread. Availability and the virtual-device
//! flag can be toggled to exercise the failure paths.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{
    AccelerationSample, ContractError, DeviceProbe, MotionSource, SampleCallback,
    SubscriptionHandle,
};
use tracing::{debug, trace};

use crate::registry::Subscribers;

/// Programmatic motion source
pub struct ManualMotionSource {
    source_id: String,
    available: AtomicBool,
    virtual_device: AtomicBool,
    subscribers: Subscribers,
}

impl ManualMotionSource {
    /// Create an available, physical-device source
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            available: AtomicBool::new(true),
            virtual_device: AtomicBool::new(false),
            subscribers: Subscribers::default(),
        }
    }

    /// Builder: mark as running on a simulator
    pub fn with_virtual_device(self, virtual_device: bool) -> Self {
        self.virtual_device.store(virtual_device, Ordering::SeqCst);
        self
    }

    /// Simulate permission being granted or revoked
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_virtual_device(&self, virtual_device: bool) {
        self.virtual_device.store(virtual_device, Ordering::SeqCst);
    }

    /// Push one sample to every subscriber
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, sample: AccelerationSample) -> usize {
        let delivered = self.subscribers.dispatch(sample);
        trace!(source_id = %self.source_id, delivered, "manual sample emitted");
        delivered
    }

    /// Push a constant-magnitude sample along the z axis
    pub fn emit_magnitude(&self, magnitude: f64) -> usize {
        self.emit(AccelerationSample::new(0.0, 0.0, magnitude))
    }
}

impl DeviceProbe for ManualMotionSource {
    fn is_virtual_device(&self) -> bool {
        self.virtual_device.load(Ordering::SeqCst)
    }
}

impl MotionSource for ManualMotionSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn subscribe(&self, callback: SampleCallback) -> Result<SubscriptionHandle, ContractError> {
        if !self.is_available() {
            return Err(ContractError::sensor_unavailable(
                &self.source_id,
                "permission denied",
            ));
        }
        let (handle, count) = self.subscribers.insert(callback);
        debug!(source_id = %self.source_id, subscribers = count, "subscribed");
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(count) = self.subscribers.remove(handle) {
            debug!(source_id = %self.source_id, subscribers = count, "unsubscribed");
        }
    }

    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
