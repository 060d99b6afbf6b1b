//! Integration tests for the six end-to-end scenarios, run against
//! [`MockBinding`]. Requires the `mock_test` feature, since
//! `codecache::util::test_util` is only compiled under `cfg(test)` or that
//! feature.

#![cfg(feature = "mock_test")]

use codecache::bundle::{BundleLayout, Lifespan};
use codecache::cache::CodeCacheBuilder;
use codecache::region::{AddressRange, CodeRegion, SemiSpaceCodeRegion};
use codecache::root_table::Root;
use codecache::util::options::CodeCacheOptions;
use codecache::util::test_util::{MockBinding, MockOracle, MockSafepoint};
use codecache::util::Address;

fn small_options(baseline: usize, opt: usize, contention: usize) -> CodeCacheOptions {
    CodeCacheOptions {
        reserved_baseline_code_cache_size: baseline,
        reserved_opt_code_cache_size: opt,
        code_cache_contention_frequency: contention,
        trace_code_allocation: false,
        verify_ref_maps: false,
    }
}

#[test]
fn cold_start_and_one_allocation() {
    let cache = CodeCacheBuilder::<MockBinding>::new(MockSafepoint::new())
        .options(small_options(128 * 1024 * 1024, 16 * 1024 * 1024, 0))
        .build();
    let oracle = MockOracle::new();

    let layout = BundleLayout::new(256, 0, 2);
    let expected_size = layout.total_size();
    let baseline_start_mark = cache.baseline().from_space().mark();

    let bundle = cache
        .allocate(layout, 1, false, Lifespan::Short, Vec::new(), &oracle, |_bytes| {})
        .expect("allocation must succeed");

    assert_eq!(
        cache.baseline().from_space().mark() - baseline_start_mark,
        expected_size
    );
    let found = cache.find_method(bundle.code_start()).expect("must find bundle");
    assert_eq!(found.payload, 1);
    assert_eq!(cache.opt().bundle_count(), 0);
}

#[test]
fn forced_contention_drives_an_eviction() {
    let cache = CodeCacheBuilder::<MockBinding>::new(MockSafepoint::new())
        .options(small_options(4096, 4096, 3))
        .build();
    let oracle = MockOracle::new();
    let layout = BundleLayout::new(64, 0, 0);
    let bundle_size = layout.total_size();

    let b1 = cache
        .allocate(layout, 1, false, Lifespan::Short, Vec::new(), &oracle, |_| {})
        .unwrap();
    let b2 = cache
        .allocate(layout, 2, false, Lifespan::Short, Vec::new(), &oracle, |_| {})
        .unwrap();
    oracle.mark_alive(b1.start);
    oracle.mark_alive(b2.start);

    // Third allocation hits the forced-failure knob and triggers eviction;
    // the two live bundles are relocated, then the third is placed fresh.
    let b3 = cache
        .allocate(layout, 3, false, Lifespan::Short, Vec::new(), &oracle, |_| {})
        .unwrap();

    let from = cache.baseline().from_space();
    assert_eq!(from.mark() - from.start(), 3 * bundle_size);
    assert_eq!(cache.baseline().stats().last_survivor_count(), 2);
    assert_eq!(cache.baseline().stats().last_survivor_bytes(), 2 * bundle_size);
    assert!(cache.baseline().stats().largest_survivor_bytes_ever() > 0);

    oracle.mark_alive(b3.start);
    let b4 = cache
        .allocate(layout, 4, false, Lifespan::Short, Vec::new(), &oracle, |_| {})
        .unwrap();
    assert_eq!(cache.baseline().from_space().bundle_count(), 4);
    let _ = b4;
}

#[test]
fn inter_bundle_call_is_relocated_on_eviction() {
    let cache = CodeCacheBuilder::<MockBinding>::new(MockSafepoint::new())
        .options(small_options(64 * 1024, 4096, 0))
        .build();
    let oracle = MockOracle::new();
    let layout = BundleLayout::new(32, 0, 0);

    let b = cache
        .allocate(layout, 2, false, Lifespan::Short, Vec::new(), &oracle, |_| {})
        .unwrap();

    // A has a direct call at offset 16 targeting B's entry point; the
    // displacement is relative to the byte after the 4-byte field (offset 20).
    let a = cache
        .allocate(layout, 1, false, Lifespan::Short, vec![16], &oracle, |bytes| {
            let displacement = (b.code_start().as_usize() as isize
                - (bytes.as_ptr() as isize + 20)) as i32;
            bytes[16..20].copy_from_slice(&displacement.to_le_bytes());
        })
        .unwrap();

    oracle.mark_alive(a.start);
    oracle.mark_alive(b.start);
    cache.force_evict(&oracle);

    let new_a = cache.find_method(a.code_start());
    // a.code_start() is stale after relocation; locate by scanning instead.
    let mut new_a_start = None;
    let mut new_b_start = None;
    cache.baseline().visit(
        |bundle| {
            if bundle.method == 1 {
                new_a_start = Some(bundle.start);
            } else if bundle.method == 2 {
                new_b_start = Some(bundle.start);
            }
            std::ops::ControlFlow::Continue(())
        },
    );
    let _ = new_a;
    let new_a_start = new_a_start.unwrap();
    let new_b_start = new_b_start.unwrap();

    let mut displacement_bytes = [0u8; 4];
    unsafe {
        std::ptr::copy_nonoverlapping(
            (new_a_start + 16).to_ptr::<u8>(),
            displacement_bytes.as_mut_ptr(),
            4,
        );
    }
    let displacement = i32::from_le_bytes(displacement_bytes);
    let expected = (new_b_start.as_usize() as isize - (new_a_start.as_usize() as isize + 20)) as i32;
    assert_eq!(displacement, expected);
}

#[test]
fn boot_to_baseline_root_is_rewritten_on_eviction() {
    let cache = CodeCacheBuilder::<MockBinding>::new(MockSafepoint::new())
        .options(small_options(64 * 1024, 4096, 0))
        .build();
    let oracle = MockOracle::new();
    let layout = BundleLayout::new(32, 0, 0);

    let b = cache
        .allocate(layout, 1, false, Lifespan::Short, Vec::new(), &oracle, |_| {})
        .unwrap();

    // A call site inside the boot region, recorded as a root into B.
    let call_site = {
        let boot_start = cache.boot().allocate_raw(32).unwrap();
        let displacement = (b.code_start().as_usize() as isize
            - (boot_start.as_usize() as isize + 4)) as i32;
        unsafe {
            std::ptr::copy_nonoverlapping(
                displacement.to_le_bytes().as_ptr(),
                boot_start.to_mut_ptr::<u8>(),
                4,
            );
        }
        boot_start
    };
    cache.record_boot_to_baseline(Root {
        call_site,
        target: b.start,
    });

    oracle.mark_alive(b.start);
    cache.force_evict(&oracle);

    let mut new_b_start = None;
    cache.baseline().visit(|bundle| {
        if bundle.method == 1 {
            new_b_start = Some(bundle.start);
        }
        std::ops::ControlFlow::Continue(())
    });
    let new_b_start = new_b_start.unwrap();

    assert_eq!(cache.root_table().snapshot()[0].target, new_b_start);
    let mut displacement_bytes = [0u8; 4];
    unsafe {
        std::ptr::copy_nonoverlapping(call_site.to_ptr::<u8>(), displacement_bytes.as_mut_ptr(), 4);
    }
    let displacement = i32::from_le_bytes(displacement_bytes);
    let expected = (new_b_start.as_usize() as isize - (call_site.as_usize() as isize + 4)) as i32;
    assert_eq!(displacement, expected);
}

#[test]
fn lookup_past_the_opt_region_misses() {
    let cache = CodeCacheBuilder::<MockBinding>::new(MockSafepoint::new())
        .options(small_options(4096, 4096, 0))
        .build();
    let far_past_everything = unsafe { Address::from_usize(usize::MAX - 8) };
    assert!(cache.find_method(far_past_everything).is_none());
}

#[test]
fn baseline_exhaustion_after_eviction_leaves_no_room() {
    // Mirrors the exhaustion scenario's substance (repeated allocation with
    // an oracle that keeps everything alive eventually leaves no room even
    // right after an eviction) without invoking the real fatal exit path,
    // since that calls `std::process::exit` and would kill the test runner.
    let mut range = AddressRange::reserve(64 * 1024);
    let half_size = 256;
    let space = SemiSpaceCodeRegion::<u32>::new(half_size, &mut range);
    let bundle_size = 64;

    for i in 0.. {
        match space.allocate_raw(bundle_size) {
            Some(addr) => {
                space.push_bundle(codecache::bundle::Bundle {
                    start: addr,
                    size: bundle_size,
                    method: i,
                    lifespan: Lifespan::Short,
                    protected: true,
                    layout: BundleLayout::new(bundle_size, 0, 0),
                    call_sites: Vec::new(),
                });
            }
            None => break,
        }
    }
    assert_eq!(space.from_space().bundle_count(), half_size / bundle_size);
    // An oracle that keeps everything alive: eviction cannot reclaim
    // anything, so immediately after flipping, `to_space` (the old,
    // now-reset `from`) still can't fit a fresh allocation on top of the
    // relocated survivors once it fills up identically on the next round.
    struct AllAlive;
    impl codecache::vm::ReachabilityOracle for AllAlive {
        fn is_alive(&self, _start: Address, _size: usize) -> bool {
            true
        }
    }
    let coordinator = codecache::util::test_util::MockSafepoint::new();
    let root_table = codecache::root_table::RootTable::new();
    codecache::evictor::evict(&space, &root_table, &coordinator, &AllAlive);
    assert!(space.allocate_raw(bundle_size).is_none());
}
