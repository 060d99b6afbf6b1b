//! The seam between the code cache and its external collaborators.
//!
//! Grounded on the teacher crate's `VMBinding` trait, which parameterises the
//! whole GC over a handful of collaborator traits supplied by the embedding
//! VM (`Collection`, `ActivePlan`, `ObjectModel`, ...) instead of hard-coding
//! a single host runtime. The code cache needs far less from its host: just
//! a safepoint/heap-allocation coordinator (owned by the object-heap
//! collector) and a reachability oracle (owned by the stack walker). Both
//! are consumed only — the core never implements either.

use crate::util::Address;

/// The "allocation-disable handle and safepoint primitive" the specification
/// says the object heap and its collector provide. [`crate::safepoint::SafepointGate`]
/// is the only caller; it restores exactly what it disabled, so a nested
/// gate that finds polling already disabled must not re-enable it on exit
/// and implementations are free to assume balanced disable/enable pairs.
pub trait SafepointCoordinator: Send + Sync {
    /// Stops every other mutator thread at its next polling point and
    /// prevents the collector from starting a cycle. Returns once all
    /// mutators are parked.
    fn block_mutators(&self);

    /// Resumes mutators parked by [`Self::block_mutators`].
    fn release_mutators(&self);

    /// Disables safepoint polling for the current thread. Returns whether
    /// polling was enabled beforehand, so the caller can restore it exactly.
    fn disable_safepoint_polling(&self) -> bool;

    /// Re-enables safepoint polling for the current thread.
    fn enable_safepoint_polling(&self);

    /// Disables entry into the heap allocator for the current thread.
    /// Returns whether it was enabled beforehand.
    fn disable_heap_allocation(&self) -> bool;

    /// Re-enables entry into the heap allocator for the current thread.
    fn enable_heap_allocation(&self);
}

/// The stack-walking subsystem's answer to "is this bundle still reachable?"
/// Supplied fresh to every [`crate::region::SemiSpaceCodeRegion::evict`] call;
/// the core does not retain it between evictions.
pub trait ReachabilityOracle {
    /// Returns whether the bundle occupying `[start, start + size)` in the
    /// from-space is still reachable and must survive this eviction.
    fn is_alive(&self, start: Address, size: usize) -> bool;
}

/// Binds the code cache to one host runtime: the opaque method-descriptor
/// type the compiler hands back to the cache, and the safepoint coordinator
/// that the singular process-wide [`crate::cache::CodeCache`] is built with.
///
/// The reachability oracle is deliberately not part of this trait: it is
/// supplied per-eviction rather than once at construction, since it is
/// produced fresh by a stack walk and has no meaningful identity between
/// collections.
pub trait CodeCacheBinding: Sized + 'static {
    /// The compiler's own method object. The core treats this as an opaque,
    /// `Copy`-able handle — it is never inspected, only stored and returned.
    type Method: Copy;

    /// The safepoint/heap-allocation coordinator owned by the object heap.
    type Safepoint: SafepointCoordinator;
}
