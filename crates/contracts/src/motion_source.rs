//! MotionSource trait - accelerometer stream abstraction
//!
//! Decouples the step detector from the platform sensor. Real sensors, mock
//! generators and recorded replays all expose the same subscribe/unsubscribe API.

use std::sync::Arc;

use crate::{AccelerationSample, ContractError};

/// Sample callback type
///
/// Invoked once per sample, in arrival order, from the source's own thread.
pub type SampleCallback = Arc<dyn Fn(AccelerationSample) + Send + Sync>;

/// Opaque handle identifying one active subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(usize);

impl SubscriptionHandle {
    pub const fn new(key: usize) -> Self {
        Self(key)
    }

    pub const fn key(self) -> usize {
        self.0
    }
}

/// Device information query
///
/// Checked before subscribing and before every persistence write.
pub trait DeviceProbe: Send + Sync {
    /// True on simulators and emulators
    fn is_virtual_device(&self) -> bool;
}

/// Accelerometer sample source
///
/// # Example
///
/// ```ignore
/// let handle = source.subscribe(Arc::new(|sample| {
///     println!("{:?}", sample);
/// }))?;
/// // ... tracking ...
/// source.unsubscribe(handle);
/// ```
pub trait MotionSource: DeviceProbe {
    /// Source identifier (used for logging)
    fn source_id(&self) -> &str;

    /// Whether the sensor can currently be subscribed (permission granted, hardware present)
    fn is_available(&self) -> bool;

    /// Register a sample callback
    ///
    /// # Errors
    /// `ContractError::SensorUnavailable` when the sensor cannot be used.
    fn subscribe(&self, callback: SampleCallback) -> Result<SubscriptionHandle, ContractError>;

    /// Release a subscription. Unknown handles are ignored.
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// Number of live subscriptions
    fn subscriber_count(&self) -> usize;
}
