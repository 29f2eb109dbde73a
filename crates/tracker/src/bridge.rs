//! Source callback to session loop bridge.
//!
//! Sources call back on their own thread; samples cross into the session
//! through a bounded channel. When the loop falls behind, new samples are
//! dropped rather than blocking the sensor thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{AccelerationSample, SampleCallback};
use tracing::trace;

pub(crate) struct SampleBridge {
    tx: Sender<AccelerationSample>,
    rx: Receiver<AccelerationSample>,
    dropped: Arc<AtomicU64>,
}

impl SampleBridge {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn receiver(&self) -> &Receiver<AccelerationSample> {
        &self.rx
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard queued samples (stale after a detach)
    pub(crate) fn drain(&self) -> usize {
        let mut drained = 0;
        while self.rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }

    /// Callback handed to the motion source
    pub(crate) fn callback(&self) -> SampleCallback {
        let tx = self.tx.clone();
        let dropped = Arc::clone(&self.dropped);

        Arc::new(move |sample| match tx.try_send(sample) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                trace!("sample queue full, sample dropped");
            }
            Err(TrySendError::Closed(_)) => {
                trace!("sample queue closed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_queue_drops_newest() {
        let bridge = SampleBridge::new(2);
        let callback = bridge.callback();

        for i in 0..5 {
            callback(AccelerationSample::new(0.0, 0.0, i as f64));
        }

        assert_eq!(bridge.dropped(), 3);
        assert_eq!(bridge.receiver().try_recv().unwrap().z, 0.0);
        assert_eq!(bridge.drain(), 1);
        assert!(bridge.receiver().try_recv().is_err());
    }
}
