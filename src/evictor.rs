//! The semi-space compaction algorithm: survivor selection, relocation,
//! direct-call fix-up, root-table fix-up, and the safepoint bracket around
//! all of it.
//!
//! Grounded on the teacher's `MarkCompactSpace` (`policy::markcompactspace`)
//! for the mark/relocate/update-references phase split, adapted from moving
//! GC objects to moving machine code: instead of rewriting object-header
//! forwarding pointers, the fix-up phase rewrites 32-bit PC-relative call
//! displacements.

use crate::bundle::Bundle;
use crate::error::{report_and_exit, FatalError};
use crate::inspect;
use crate::region::SemiSpaceCodeRegion;
use crate::root_table::RootTable;
use crate::util::address::Address;
use crate::vm::{ReachabilityOracle, SafepointCoordinator};
use std::collections::HashMap;
use std::ops::ControlFlow;

/// One survivor's old and new location, used to translate direct-call
/// targets during relocation.
struct Placement<M> {
    bundle: Bundle<M>,
    new_start: Address,
}

/// Runs one eviction cycle on `semispace`, using `reachability` to decide
/// which bundles survive and rewriting every direct call and root-table
/// entry that targeted a survivor. Returns `(survivor_count, survivor_bytes)`.
///
/// Must be called with the cache-wide mutex held, mirroring every other
/// mutator of `semispace`'s bundle index.
pub fn evict<M: Copy, S: SafepointCoordinator>(
    semispace: &SemiSpaceCodeRegion<M>,
    root_table: &RootTable,
    coordinator: &S,
    reachability: &dyn ReachabilityOracle,
) -> (usize, usize) {
    coordinator.block_mutators();
    inspect::notify_eviction_started();

    let from_start = semispace.from_space().start();
    let from_end = semispace.from_space().end();

    let mut survivors = Vec::new();
    semispace.from_space().visit(|bundle| {
        if reachability.is_alive(bundle.start, bundle.size) {
            survivors.push(bundle.clone());
        }
        ControlFlow::Continue(())
    });

    let mut placements = Vec::with_capacity(survivors.len());
    let mut relocation_map = HashMap::with_capacity(survivors.len());
    for bundle in survivors {
        let new_start = semispace
            .to_space()
            .allocate_raw(bundle.size)
            .unwrap_or_else(|| report_and_exit(FatalError::ToSpaceOverflow));
        relocation_map.insert(bundle.start, new_start);
        placements.push(Placement { bundle, new_start });
    }

    let mut survivor_bytes = 0usize;
    for placement in &placements {
        let old = &placement.bundle;
        unsafe {
            std::ptr::copy_nonoverlapping(
                old.start.to_ptr::<u8>(),
                placement.new_start.to_mut_ptr::<u8>(),
                old.size,
            );
        }
        for &offset in &old.call_sites {
            relocate_call_site(
                placement.new_start,
                offset,
                old.start,
                from_start,
                from_end,
                &relocation_map,
            );
        }
        let mut relocated = old.clone();
        relocated.start = placement.new_start;
        semispace.to_space().push_bundle(relocated);
        survivor_bytes += old.size;
    }

    root_table.for_each_mut(|root| {
        if let Some(&new_target) = relocation_map.get(&root.target) {
            rewrite_displacement(root.call_site, new_target);
            root.target = new_target;
        }
    });

    semispace.flip();

    let survivor_count = placements.len();
    semispace.stats().record_eviction(survivor_count, survivor_bytes);

    inspect::notify_eviction_completed();
    coordinator.release_mutators();

    (survivor_count, survivor_bytes)
}

/// Recomputes and rewrites the displacement at `new_bundle_start + offset`
/// (the call site's new location, since the whole bundle just moved there).
/// The old displacement is read from the now-relocated bytes — relocation
/// is a pure byte copy, so it is unchanged until this function overwrites it.
fn relocate_call_site(
    new_bundle_start: Address,
    offset: usize,
    old_bundle_start: Address,
    from_start: Address,
    from_end: Address,
    relocation_map: &HashMap<Address, Address>,
) {
    let old_call_site = old_bundle_start + offset;
    let new_call_site = new_bundle_start + offset;
    let old_displacement = unsafe { read_i32(new_call_site) };
    let old_target = unsafe { Address::from_usize(((old_call_site.as_usize() + 4) as i64 + old_displacement as i64) as usize) };

    let new_target = if old_target >= from_start && old_target < from_end {
        *relocation_map
            .get(&old_target)
            .unwrap_or(&old_target)
    } else {
        old_target
    };

    rewrite_displacement(new_call_site, new_target);
}

/// Rewrites the 32-bit displacement at `call_site` so that it encodes a
/// direct call from `call_site` to `target`.
fn rewrite_displacement(call_site: Address, target: Address) {
    let displacement = call_site.offset_to(target) - 4;
    let Ok(displacement) = i32::try_from(displacement) else {
        report_and_exit(FatalError::DisplacementOverflow {
            from: call_site,
            to: target,
        });
    };
    unsafe { write_i32(call_site, displacement) };
}

unsafe fn read_i32(addr: Address) -> i32 {
    let mut bytes = [0u8; 4];
    unsafe {
        std::ptr::copy_nonoverlapping(addr.to_ptr::<u8>(), bytes.as_mut_ptr(), 4);
    }
    i32::from_le_bytes(bytes)
}

unsafe fn write_i32(addr: Address, value: i32) {
    let bytes = value.to_le_bytes();
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), addr.to_mut_ptr::<u8>(), 4);
    }
}
