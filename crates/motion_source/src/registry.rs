//! Subscriber registry shared by every source.
//!
//! Callbacks live in a slab; the slab key doubles as the `SubscriptionHandle`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{AccelerationSample, SampleCallback, SubscriptionHandle};
use slab::Slab;

#[derive(Default)]
pub(crate) struct Subscribers {
    callbacks: Mutex<Slab<SampleCallback>>,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, Slab<SampleCallback>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a callback, returning its handle and the new subscriber count
    pub(crate) fn insert(&self, callback: SampleCallback) -> (SubscriptionHandle, usize) {
        let mut callbacks = self.lock();
        let key = callbacks.insert(callback);
        (SubscriptionHandle::new(key), callbacks.len())
    }

    /// Remove a callback, returning the remaining count (None if unknown)
    pub(crate) fn remove(&self, handle: SubscriptionHandle) -> Option<usize> {
        let mut callbacks = self.lock();
        callbacks.try_remove(handle.key())?;
        Some(callbacks.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Deliver a sample to every subscriber
    ///
    /// Callbacks are invoked outside the lock so they may unsubscribe.
    pub(crate) fn dispatch(&self, sample: AccelerationSample) -> usize {
        let snapshot: Vec<SampleCallback> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in &snapshot {
            callback(sample);
        }
        snapshot.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_insert_remove_dispatch() {
        let subscribers = Subscribers::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();

        let (handle, count) = subscribers.insert(Arc::new(move |_| {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(count, 1);

        assert_eq!(subscribers.dispatch(AccelerationSample::default()), 1);
        assert_eq!(hits.load(Ordering::Relaxed), 1);

        assert_eq!(subscribers.remove(handle), Some(0));
        assert_eq!(subscribers.remove(handle), None);
        assert_eq!(subscribers.dispatch(AccelerationSample::default()), 0);
    }
}
