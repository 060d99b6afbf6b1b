//! The three region kinds a bundle can live in, and a uniform read-side
//! view across them.
//!
//! Grounded on the teacher's `SFT` trait (`policy::sft`), which gives every
//! GC space a common dispatch surface for space-membership queries while
//! each space keeps its own mutating API. The boot and opt regions are
//! plain append-only [`CodeRegion`]s; the baseline region is a
//! [`SemiSpaceCodeRegion`] of two such halves. [`RegionRef`] is the tagged
//! variant the specification's design notes ask for: one enum with a
//! shared read-side `contains`/`find`/`visit`, and the mutating allocation
//! API left on each concrete type since append-only and semi-space
//! allocation have different failure semantics (the former is simply full;
//! the latter can be retried after an eviction).

pub mod address_range;
pub mod code_region;
pub mod semispace;

pub use address_range::AddressRange;
pub use code_region::CodeRegion;
pub use semispace::SemiSpaceCodeRegion;

use crate::bundle::Bundle;
use crate::util::address::Address;
use std::ops::ControlFlow;

/// Which region a given bundle or address belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RegionKind {
    Boot,
    Baseline,
    Opt,
}

/// A borrowed, read-only view of one region, abstracting over the two
/// concrete shapes (`CodeRegion` and `SemiSpaceCodeRegion`) behind a common
/// interface for membership tests, lookup, and iteration.
pub enum RegionRef<'a, M> {
    AppendOnly(&'a CodeRegion<M>),
    SemiSpace(&'a SemiSpaceCodeRegion<M>),
}

impl<'a, M: Copy> RegionRef<'a, M> {
    pub fn contains(&self, addr: Address) -> bool {
        match self {
            RegionRef::AppendOnly(r) => r.contains(addr),
            RegionRef::SemiSpace(r) => r.contains(addr),
        }
    }

    pub fn find(&self, addr: Address) -> Option<Bundle<M>> {
        match self {
            RegionRef::AppendOnly(r) => r.find(addr),
            RegionRef::SemiSpace(r) => r.find(addr),
        }
    }

    pub fn visit(&self, visitor: impl FnMut(&Bundle<M>) -> ControlFlow<()>) {
        match self {
            RegionRef::AppendOnly(r) => r.visit(visitor),
            RegionRef::SemiSpace(r) => r.visit(visitor),
        }
    }
}
