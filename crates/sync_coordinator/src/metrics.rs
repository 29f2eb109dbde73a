//! Per-coordinator counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Sync counters shared between the coordinator and reporters
#[derive(Debug, Default)]
pub struct SyncMetrics {
    write_count: AtomicU64,
    failure_count: AtomicU64,
    skipped_no_delta: AtomicU64,
    skipped_virtual_device: AtomicU64,
    deferred_count: AtomicU64,
    last_written_delta: AtomicU64,
    pending_delta: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful writes
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped_no_delta(&self) -> u64 {
        self.skipped_no_delta.load(Ordering::Relaxed)
    }

    pub fn inc_skipped_no_delta(&self) {
        self.skipped_no_delta.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped_virtual_device(&self) -> u64 {
        self.skipped_virtual_device.load(Ordering::Relaxed)
    }

    pub fn inc_skipped_virtual_device(&self) {
        self.skipped_virtual_device.fetch_add(1, Ordering::Relaxed);
    }

    /// Flushes postponed because a write was in flight
    pub fn deferred_count(&self) -> u64 {
        self.deferred_count.load(Ordering::Relaxed)
    }

    pub fn inc_deferred_count(&self) {
        self.deferred_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_written_delta(&self) -> u64 {
        self.last_written_delta.load(Ordering::Relaxed)
    }

    pub fn set_last_written_delta(&self, delta: u64) {
        self.last_written_delta.store(delta, Ordering::Relaxed);
    }

    pub fn pending_delta(&self) -> u64 {
        self.pending_delta.load(Ordering::Relaxed)
    }

    pub fn set_pending_delta(&self, delta: u64) {
        self.pending_delta.store(delta, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            skipped_no_delta: self.skipped_no_delta(),
            skipped_virtual_device: self.skipped_virtual_device(),
            deferred_count: self.deferred_count(),
            last_written_delta: self.last_written_delta(),
            pending_delta: self.pending_delta(),
        }
    }
}

/// Snapshot of sync counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    pub write_count: u64,
    pub failure_count: u64,
    pub skipped_no_delta: u64,
    pub skipped_virtual_device: u64,
    pub deferred_count: u64,
    pub last_written_delta: u64,
    pub pending_delta: u64,
}
