//! The handle `findMethod` hands back: enough to get from an arbitrary
//! instruction address to the owning bundle and the compiler's own method
//! object for it.

use crate::util::address::Address;

/// A lookup result: the bundle's start address (stable between evictions,
/// rewritten by relocation the same as any other inbound reference) plus
/// the compiler-supplied, opaque method payload carried in [`crate::bundle::Bundle::method`].
#[derive(Copy, Clone, Debug)]
pub struct TargetMethod<M> {
    pub bundle: Address,
    pub payload: M,
}
