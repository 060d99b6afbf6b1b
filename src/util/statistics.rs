//! Eviction counters exposed for an out-of-process debugger or inspector.
//!
//! Modelled on the teacher's `util::statistics` counters: plain atomics
//! updated only from inside the evictor, read from anywhere without locking.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Running statistics for a [`crate::region::SemiSpaceCodeRegion`].
#[derive(Debug, Default)]
pub struct EvictionStats {
    eviction_count: AtomicUsize,
    last_survivor_count: AtomicUsize,
    last_survivor_bytes: AtomicUsize,
    largest_survivor_bytes_ever: AtomicUsize,
}

impl EvictionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_eviction(&self, survivor_count: usize, survivor_bytes: usize) {
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        self.last_survivor_count.store(survivor_count, Ordering::Relaxed);
        self.last_survivor_bytes.store(survivor_bytes, Ordering::Relaxed);
        self.largest_survivor_bytes_ever
            .fetch_max(survivor_bytes, Ordering::Relaxed);
    }

    pub fn eviction_count(&self) -> usize {
        self.eviction_count.load(Ordering::Relaxed)
    }

    pub fn last_survivor_count(&self) -> usize {
        self.last_survivor_count.load(Ordering::Relaxed)
    }

    pub fn last_survivor_bytes(&self) -> usize {
        self.last_survivor_bytes.load(Ordering::Relaxed)
    }

    pub fn largest_survivor_bytes_ever(&self) -> usize {
        self.largest_survivor_bytes_ever.load(Ordering::Relaxed)
    }
}
