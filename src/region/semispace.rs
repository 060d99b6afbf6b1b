//! The baseline region: two [`CodeRegion`] halves, only one of which is
//! ever live (the "from" half). Eviction copies survivors into the idle
//! half and flips which one is active; the actual mark/copy/relocate
//! algorithm lives in [`crate::evictor`], which drives this type through
//! its half accessors and [`SemiSpaceCodeRegion::flip`].

use crate::bundle::Bundle;
use crate::region::address_range::AddressRange;
use crate::region::code_region::CodeRegion;
use crate::util::address::Address;
use crate::util::statistics::EvictionStats;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct SemiSpaceCodeRegion<M> {
    halves: [CodeRegion<M>; 2],
    /// Index into `halves` of the currently live ("from") half.
    active: AtomicUsize,
    stats: EvictionStats,
}

impl<M: Copy> SemiSpaceCodeRegion<M> {
    /// Carves two `half_size`-byte halves out of `range` and starts with
    /// half 0 active.
    pub fn new(half_size: usize, range: &mut AddressRange) -> Self {
        let a = range.carve(half_size);
        let b = range.carve(half_size);
        SemiSpaceCodeRegion {
            halves: [CodeRegion::new(a, half_size), CodeRegion::new(b, half_size)],
            active: AtomicUsize::new(0),
            stats: EvictionStats::new(),
        }
    }

    pub fn half_size(&self) -> usize {
        self.halves[0].capacity()
    }

    /// The currently live half: allocation and lookup both target this one.
    pub fn from_space(&self) -> &CodeRegion<M> {
        &self.halves[self.active.load(Ordering::Acquire)]
    }

    /// The currently idle half: eviction copies survivors here.
    pub fn to_space(&self) -> &CodeRegion<M> {
        &self.halves[1 - self.active.load(Ordering::Acquire)]
    }

    pub fn stats(&self) -> &EvictionStats {
        &self.stats
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.halves[0].contains(addr) || self.halves[1].contains(addr)
    }

    pub fn allocate_raw(&self, size: usize) -> Option<Address> {
        self.from_space().allocate_raw(size)
    }

    pub fn push_bundle(&self, bundle: Bundle<M>) {
        self.from_space().push_bundle(bundle)
    }

    /// Only the live half holds bundles a normal lookup should find; the
    /// idle half is either empty or mid-eviction garbage.
    pub fn find(&self, addr: Address) -> Option<Bundle<M>> {
        self.from_space().find(addr)
    }

    pub fn visit(&self, visitor: impl FnMut(&Bundle<M>) -> ControlFlow<()>) {
        self.from_space().visit(visitor)
    }

    /// Swaps which half is live, then resets the now-idle half (the
    /// pre-flip "from") so it is ready to receive survivors on the next
    /// eviction. Only [`crate::evictor`] calls this, after it has finished
    /// copying every survivor into the pre-flip "to" half.
    pub(crate) fn flip(&self) {
        let old_active = self.active.load(Ordering::Acquire);
        let new_active = 1 - old_active;
        self.active.store(new_active, Ordering::Release);
        self.halves[old_active].reset();
    }
}
