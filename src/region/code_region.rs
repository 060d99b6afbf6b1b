//! The append-only bump allocator shared by the boot region, the opt
//! region, and each half of the baseline semi-space.

use crate::bundle::Bundle;
use crate::util::address::Address;
use crossbeam::utils::CachePadded;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// A single contiguous byte range, bump-allocated from `start` towards
/// `end`, with every live bundle additionally tracked in an address-order
/// index.
///
/// Bundles are appended in increasing-address order because the bump
/// pointer only ever moves forward, so the index never needs an explicit
/// sort: insertion order already is address order, and lookups binary
/// search it with [`slice::partition_point`]. This is the region's one
/// departure from a literal lock-free structure — reads take a shared
/// [`RwLock`] read guard rather than running over an atomic snapshot — but
/// it satisfies the same observable contract the specification asks for:
/// a concurrent reader never sees a bundle that is not yet fully
/// constructed, and a bundle becomes visible to readers atomically at
/// [`CodeRegion::push_bundle`].
#[derive(Debug)]
pub struct CodeRegion<M> {
    start: Address,
    end: Address,
    /// The next free address. Always in `[start, end]`. Every allocating
    /// mutator thread contends on this one word, so it is cache-line padded
    /// to keep that contention from also slowing down whatever happens to
    /// share its cache line.
    mark: CachePadded<AtomicUsize>,
    bundles: RwLock<Vec<Bundle<M>>>,
}

impl<M: Copy> CodeRegion<M> {
    pub fn new(start: Address, size: usize) -> Self {
        CodeRegion {
            start,
            end: start + size,
            mark: CachePadded::new(AtomicUsize::new(start.as_usize())),
            bundles: RwLock::new(Vec::new()),
        }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn capacity(&self) -> usize {
        self.end - self.start
    }

    /// The current bump pointer: the start of free space.
    pub fn mark(&self) -> Address {
        unsafe { Address::from_usize(self.mark.load(Ordering::Acquire)) }
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Reserves `size` bytes at the current mark and advances it, or
    /// returns `None` if the region does not have `size` bytes left.
    /// Reserving space does not make it visible to readers; the caller
    /// must follow up with [`Self::push_bundle`] once the bundle's bytes
    /// are fully written.
    pub fn allocate_raw(&self, size: usize) -> Option<Address> {
        let mut current = self.mark.load(Ordering::Relaxed);
        loop {
            let candidate = current.checked_add(size)?;
            if candidate > self.end.as_usize() {
                return None;
            }
            match self.mark.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(unsafe { Address::from_usize(current) }),
                Err(observed) => current = observed,
            }
        }
    }

    /// Publishes `bundle` to the region's index. Must be called exactly
    /// once per successful [`Self::allocate_raw`], after the bundle's code
    /// and literals have been fully written, and in increasing-`start`
    /// order relative to prior calls (true by construction, since callers
    /// only ever allocate and immediately publish before allocating again
    /// at a higher address).
    pub fn push_bundle(&self, bundle: Bundle<M>) {
        let mut bundles = self.bundles.write().unwrap();
        debug_assert!(
            bundles.last().map(|b| b.start < bundle.start).unwrap_or(true),
            "bundles must be published in increasing address order"
        );
        bundles.push(bundle);
    }

    /// Finds the bundle containing `addr`, if any.
    pub fn find(&self, addr: Address) -> Option<Bundle<M>> {
        let bundles = self.bundles.read().unwrap();
        let idx = bundles.partition_point(|b| b.start <= addr);
        if idx == 0 {
            return None;
        }
        let candidate = &bundles[idx - 1];
        candidate.contains(addr).then(|| candidate.clone())
    }

    /// Visits every live bundle in address order, stopping early if the
    /// visitor requests it.
    pub fn visit(&self, mut visitor: impl FnMut(&Bundle<M>) -> ControlFlow<()>) {
        let bundles = self.bundles.read().unwrap();
        for bundle in bundles.iter() {
            if visitor(bundle).is_break() {
                break;
            }
        }
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.read().unwrap().len()
    }

    /// Discards every bundle and rewinds the bump pointer to `start`,
    /// preparing the region to be reused as the other half of a flip.
    pub fn reset(&self) {
        self.mark.store(self.start.as_usize(), Ordering::Release);
        self.bundles.write().unwrap().clear();
    }
}
