//! Fixed-capacity magnitude window.

use std::fmt;

use ringbuf::{traits::*, HeapRb};

/// FIFO of the most recent magnitudes
///
/// Pushing past capacity evicts the oldest value.
pub struct SlidingWindow {
    values: HeapRb<f64>,
    capacity: usize,
}

impl fmt::Debug for SlidingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindow")
            .field("len", &self.values.occupied_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl SlidingWindow {
    /// Create a window holding `capacity` values (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: HeapRb::new(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, magnitude: f64) {
        self.values.push_overwrite(magnitude);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.values.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean, available only once the window is full
    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let sum: f64 = self.values.iter().sum();
        Some(sum / self.capacity as f64)
    }

    /// Drop every value (warm-up starts over)
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
