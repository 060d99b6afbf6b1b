//! The scoped critical section around every allocation: disables per-thread
//! safepoint polling and heap allocation for as long as the guard is held,
//! and restores exactly what it disabled on every exit path.
//!
//! Grounded on the teacher's scoped-guard convention (a `Drop` impl that
//! restores invariants no matter how the scope is left, used pervasively for
//! GC-mutator coordination) rather than a manual enter/exit pair that a
//! `?`-early-return could bypass.

use crate::vm::SafepointCoordinator;

/// RAII guard produced by [`SafepointGate::enter`]. While held, the current
/// thread will not be stopped at a safepoint and will not enter the heap
/// allocator; both restrictions are lifted when the guard drops.
///
/// Nested acquisition is idempotent: if an outer gate already disabled
/// polling (or heap allocation), an inner gate observes that and leaves it
/// disabled on its own exit, deferring the re-enable to the outer gate.
/// This relies on the coordinator itself reporting accurate prior state,
/// since the coordinator — not this guard — is the thing with per-thread
/// memory across nested calls.
pub struct SafepointGate<'a, S: SafepointCoordinator> {
    coordinator: &'a S,
    restore_polling: bool,
    restore_heap_allocation: bool,
}

impl<'a, S: SafepointCoordinator> SafepointGate<'a, S> {
    /// Disables safepoint polling and heap allocation for the current
    /// thread and returns a guard that restores them on drop.
    pub fn enter(coordinator: &'a S) -> Self {
        let restore_polling = coordinator.disable_safepoint_polling();
        let restore_heap_allocation = coordinator.disable_heap_allocation();
        SafepointGate {
            coordinator,
            restore_polling,
            restore_heap_allocation,
        }
    }
}

impl<'a, S: SafepointCoordinator> Drop for SafepointGate<'a, S> {
    fn drop(&mut self) {
        if self.restore_heap_allocation {
            self.coordinator.enable_heap_allocation();
        }
        if self.restore_polling {
            self.coordinator.enable_safepoint_polling();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingCoordinator {
        polling_disabled: Cell<bool>,
        heap_alloc_disabled: Cell<bool>,
        enable_polling_calls: Cell<usize>,
        enable_heap_alloc_calls: Cell<usize>,
    }

    impl CountingCoordinator {
        fn new() -> Self {
            CountingCoordinator {
                polling_disabled: Cell::new(false),
                heap_alloc_disabled: Cell::new(false),
                enable_polling_calls: Cell::new(0),
                enable_heap_alloc_calls: Cell::new(0),
            }
        }
    }

    impl SafepointCoordinator for CountingCoordinator {
        fn block_mutators(&self) {}
        fn release_mutators(&self) {}

        fn disable_safepoint_polling(&self) -> bool {
            let was_enabled = !self.polling_disabled.replace(true);
            was_enabled
        }
        fn enable_safepoint_polling(&self) {
            self.polling_disabled.set(false);
            self.enable_polling_calls.set(self.enable_polling_calls.get() + 1);
        }

        fn disable_heap_allocation(&self) -> bool {
            let was_enabled = !self.heap_alloc_disabled.replace(true);
            was_enabled
        }
        fn enable_heap_allocation(&self) {
            self.heap_alloc_disabled.set(false);
            self.enable_heap_alloc_calls
                .set(self.enable_heap_alloc_calls.get() + 1);
        }
    }

    #[test]
    fn single_gate_restores_on_drop() {
        let coordinator = CountingCoordinator::new();
        {
            let _gate = SafepointGate::enter(&coordinator);
            assert!(coordinator.polling_disabled.get());
            assert!(coordinator.heap_alloc_disabled.get());
        }
        assert!(!coordinator.polling_disabled.get());
        assert!(!coordinator.heap_alloc_disabled.get());
        assert_eq!(coordinator.enable_polling_calls.get(), 1);
        assert_eq!(coordinator.enable_heap_alloc_calls.get(), 1);
    }

    #[test]
    fn nested_gate_does_not_re_enable_early() {
        let coordinator = CountingCoordinator::new();
        {
            let _outer = SafepointGate::enter(&coordinator);
            {
                let _inner = SafepointGate::enter(&coordinator);
            }
            // The inner gate found everything already disabled, so it must
            // not have re-enabled anything while the outer gate is live.
            assert!(coordinator.polling_disabled.get());
            assert!(coordinator.heap_alloc_disabled.get());
            assert_eq!(coordinator.enable_polling_calls.get(), 0);
            assert_eq!(coordinator.enable_heap_alloc_calls.get(), 0);
        }
        assert!(!coordinator.polling_disabled.get());
        assert!(!coordinator.heap_alloc_disabled.get());
    }
}
