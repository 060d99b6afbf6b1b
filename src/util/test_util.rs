//! An in-process, single-threaded test binding.
//!
//! Grounded on the teacher's `util::test_util::mock_vm`, which provides a
//! minimal `VMBinding` implementation so GC algorithms can be exercised
//! without a real VM attached. `MockBinding` plays the same role here: no
//! real thread parking, no real stack walker, just enough bookkeeping for
//! assertions.

use crate::util::address::Address;
use crate::vm::{CodeCacheBinding, ReachabilityOracle, SafepointCoordinator};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records how many times each coordination call was made, and whether
/// mutators are currently (notionally) blocked, without doing anything a
/// real multi-threaded runtime would need.
#[derive(Debug, Default)]
pub struct MockSafepoint {
    pub block_mutators_calls: AtomicUsize,
    pub release_mutators_calls: AtomicUsize,
    polling_disabled: Mutex<bool>,
    heap_alloc_disabled: Mutex<bool>,
}

impl MockSafepoint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SafepointCoordinator for MockSafepoint {
    fn block_mutators(&self) {
        self.block_mutators_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn release_mutators(&self) {
        self.release_mutators_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn disable_safepoint_polling(&self) -> bool {
        let mut disabled = self.polling_disabled.lock().unwrap();
        let was_enabled = !*disabled;
        *disabled = true;
        was_enabled
    }

    fn enable_safepoint_polling(&self) {
        *self.polling_disabled.lock().unwrap() = false;
    }

    fn disable_heap_allocation(&self) -> bool {
        let mut disabled = self.heap_alloc_disabled.lock().unwrap();
        let was_enabled = !*disabled;
        *disabled = true;
        was_enabled
    }

    fn enable_heap_allocation(&self) {
        *self.heap_alloc_disabled.lock().unwrap() = false;
    }
}

/// A reachability oracle the test populates directly instead of walking a
/// real stack.
#[derive(Debug, Default)]
pub struct MockOracle {
    alive: Mutex<HashSet<usize>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_alive(&self, addr: Address) {
        self.alive.lock().unwrap().insert(addr.as_usize());
    }

    pub fn mark_dead(&self, addr: Address) {
        self.alive.lock().unwrap().remove(&addr.as_usize());
    }
}

impl ReachabilityOracle for MockOracle {
    fn is_alive(&self, start: Address, _size: usize) -> bool {
        self.alive.lock().unwrap().contains(&start.as_usize())
    }
}

/// The binding used by every test: an opaque `u32` method id and
/// [`MockSafepoint`] as the coordinator.
pub struct MockBinding;

impl CodeCacheBinding for MockBinding {
    type Method = u32;
    type Safepoint = MockSafepoint;
}
