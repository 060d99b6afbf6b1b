//! The top-level façade: routes allocations by lifespan, drives eviction
//! under contention, and exposes reverse lookup.
//!
//! Grounded on the teacher's `MMTK<VM>` (`src/mmtk.rs`): one generic,
//! binding-parameterised struct owning every sub-allocator, built once via
//! a builder and handed to the embedder as an owned value rather than
//! reached for through a crate-internal generic singleton. `MMTK<VM>`
//! itself is not stored behind a static inside mmtk-core either — the
//! binding crate (which knows the concrete `VM`) owns that static, the same
//! way an embedder of this crate is expected to hold the returned
//! `CodeCache<ConcreteBinding>` in a `static CODE_CACHE: OnceLock<_>` of
//! its own. A generic `static` keyed on `B` cannot be expressed inside this
//! crate (Rust forbids statics that depend on an enclosing generic
//! parameter), so this crate stops at producing the owned value.

use crate::bundle::{Bundle, BundleLayout, Lifespan};
use crate::error::{report_and_exit, FatalError};
use crate::evictor;
use crate::region::{AddressRange, CodeRegion, RegionRef, SemiSpaceCodeRegion};
use crate::root_table::{Root, RootTable};
use crate::safepoint::SafepointGate;
use crate::target_method::TargetMethod;
use crate::util::address::Address;
use crate::util::options::CodeCacheOptions;
use crate::vm::{CodeCacheBinding, ReachabilityOracle};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// The process-wide machine-code cache for one host runtime `B`.
///
/// Owns three regions carved out of a single reserved address window (boot,
/// baseline, opt), the boot→baseline root table, and the binding's
/// safepoint coordinator. Every mutating operation serialises on
/// `alloc_mutex`, matching the specification's "a cache-wide mutex
/// serialises allocate, recordBootToBaseline, and evict".
pub struct CodeCache<B: CodeCacheBinding> {
    options: CodeCacheOptions,
    /// Kept alive only so the reservation is released when the cache is
    /// dropped; never read after construction.
    _address_range: AddressRange,
    boot: CodeRegion<B::Method>,
    baseline: SemiSpaceCodeRegion<B::Method>,
    opt: CodeRegion<B::Method>,
    root_table: RootTable,
    safepoint: B::Safepoint,
    alloc_mutex: Mutex<()>,
    baseline_alloc_count: AtomicUsize,
}

impl<B: CodeCacheBinding> CodeCache<B> {
    /// Tests boot, then baseline, then opt, in that fixed order.
    pub fn find_region(&self, addr: Address) -> Option<RegionRef<'_, B::Method>> {
        if self.boot.contains(addr) {
            Some(RegionRef::AppendOnly(&self.boot))
        } else if self.baseline.contains(addr) {
            Some(RegionRef::SemiSpace(&self.baseline))
        } else if self.opt.contains(addr) {
            Some(RegionRef::AppendOnly(&self.opt))
        } else {
            None
        }
    }

    /// Reverse lookup: the owning method for an arbitrary instruction
    /// address, or `None` on a miss (a normal outcome, not an error).
    pub fn find_method(&self, addr: Address) -> Option<TargetMethod<B::Method>> {
        let bundle = self.find_region(addr)?.find(addr)?;
        Some(TargetMethod {
            bundle: bundle.start,
            payload: bundle.method,
        })
    }

    /// Appends a boot→baseline root under the cache mutex.
    pub fn record_boot_to_baseline(&self, caller: Root) {
        let _guard = self.alloc_mutex.lock().unwrap();
        self.root_table.append(caller);
    }

    /// Visits bundles in the fixed region order (boot if requested, then
    /// baseline, then opt), stopping early if the visitor breaks.
    pub fn visit_cells(
        &self,
        mut visitor: impl FnMut(&Bundle<B::Method>) -> ControlFlow<()>,
        include_boot: bool,
    ) {
        let mut stopped = false;
        if include_boot {
            self.boot.visit(|b| {
                let cf = visitor(b);
                stopped = cf.is_break();
                cf
            });
        }
        if !stopped {
            self.baseline.visit(|b| {
                let cf = visitor(b);
                stopped = cf.is_break();
                cf
            });
        }
        if !stopped {
            self.opt.visit(|b| visitor(b));
        }
    }

    /// Allocates storage for one compiled method and returns the published
    /// bundle, or `None` if `in_heap` is set (the object heap is an external
    /// collaborator; this core never touches code regions for it).
    ///
    /// `fill` writes the bundle's code and literal bytes into freshly
    /// reserved, not-yet-visible memory; `call_sites` are the byte offsets
    /// of every direct-call displacement field the compiler placed in that
    /// code, supplied by the caller rather than discovered by disassembly.
    /// `reachability` is consulted only if allocating into the baseline
    /// region triggers an eviction.
    pub fn allocate(
        &self,
        layout: BundleLayout,
        method: B::Method,
        in_heap: bool,
        lifespan: Lifespan,
        call_sites: Vec<usize>,
        reachability: &dyn ReachabilityOracle,
        fill: impl FnOnce(&mut [u8]),
    ) -> Option<Bundle<B::Method>> {
        if in_heap {
            return None;
        }

        let _mutex_guard = self.alloc_mutex.lock().unwrap();
        let _safepoint_guard = SafepointGate::enter(&self.safepoint);

        let size = layout.total_size();
        let start = if lifespan.is_baseline() {
            self.allocate_baseline(size, reachability)
        } else {
            self.opt
                .allocate_raw(size)
                .unwrap_or_else(|| report_and_exit(FatalError::OptExhausted))
        };

        let slice = unsafe { std::slice::from_raw_parts_mut(start.to_mut_ptr::<u8>(), size) };
        fill(slice);

        let bundle = Bundle {
            start,
            size,
            method,
            lifespan,
            protected: true,
            layout,
            call_sites,
        };

        if self.options.trace_code_allocation {
            log::info!("codecache: allocated {size} bytes at {start} (lifespan {lifespan:?})");
        }

        if lifespan.is_baseline() {
            self.baseline.push_bundle(bundle.clone());
        } else {
            self.opt.push_bundle(bundle.clone());
        }

        Some(bundle)
    }

    /// The baseline allocation path: optionally forces the first attempt to
    /// fail (contention-test mode), evicts and retries exactly once on
    /// failure, and exits fatally if the retry also fails.
    fn allocate_baseline(&self, size: usize, reachability: &dyn ReachabilityOracle) -> Address {
        let forced_failure = self.next_allocation_is_forced_failure();
        let first_attempt = if forced_failure {
            None
        } else {
            self.baseline.allocate_raw(size)
        };

        if let Some(addr) = first_attempt {
            return addr;
        }

        let (survivor_count, survivor_bytes) =
            evictor::evict(&self.baseline, &self.root_table, &self.safepoint, reachability);
        log::info!(
            "codecache: eviction reclaimed baseline space, {survivor_count} survivors, {survivor_bytes} bytes"
        );

        self.baseline
            .allocate_raw(size)
            .unwrap_or_else(|| report_and_exit(FatalError::BaselineExhausted))
    }

    fn next_allocation_is_forced_failure(&self) -> bool {
        let frequency = self.options.code_cache_contention_frequency;
        if frequency == 0 {
            return false;
        }
        let n = self.baseline_alloc_count.fetch_add(1, Ordering::Relaxed) + 1;
        n % frequency == 0
    }

    /// Runs an eviction cycle immediately, independent of the
    /// contention-test knob. Exposed for callers (and tests) that want to
    /// drive compaction explicitly rather than waiting for a baseline
    /// allocation to fail.
    pub fn force_evict(&self, reachability: &dyn ReachabilityOracle) -> (usize, usize) {
        let _guard = self.alloc_mutex.lock().unwrap();
        evictor::evict(&self.baseline, &self.root_table, &self.safepoint, reachability)
    }

    pub fn root_table(&self) -> &RootTable {
        &self.root_table
    }

    pub fn options(&self) -> &CodeCacheOptions {
        &self.options
    }

    pub fn baseline(&self) -> &SemiSpaceCodeRegion<B::Method> {
        &self.baseline
    }

    pub fn opt(&self) -> &CodeRegion<B::Method> {
        &self.opt
    }

    pub fn boot(&self) -> &CodeRegion<B::Method> {
        &self.boot
    }
}

/// Builds a [`CodeCache`] from a [`CodeCacheOptions`] and a binding's
/// safepoint coordinator, mirroring the teacher's `MMTKBuilder`.
pub struct CodeCacheBuilder<B: CodeCacheBinding> {
    options: CodeCacheOptions,
    safepoint: B::Safepoint,
}

impl<B: CodeCacheBinding> CodeCacheBuilder<B> {
    /// Starts from [`CodeCacheOptions::default`] overridden by any
    /// well-formed `CODECACHE_*` environment variables.
    pub fn new(safepoint: B::Safepoint) -> Self {
        let mut options = CodeCacheOptions::default();
        options.read_env_var_settings();
        CodeCacheBuilder { options, safepoint }
    }

    pub fn options(mut self, options: CodeCacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Reserves the address window, carves out boot, baseline, and opt, and
    /// produces the cache. The boot region is sized as a small fixed
    /// fraction of the opt region budget: it holds only force-compiled
    /// runtime entry points, never ordinary compiled methods.
    pub fn build(self) -> CodeCache<B> {
        crate::util::logger::try_init();

        const BOOT_REGION_SIZE: usize = 256 * 1024;

        let total = BOOT_REGION_SIZE
            + self.options.reserved_baseline_code_cache_size
            + self.options.reserved_opt_code_cache_size;
        let mut range = AddressRange::reserve(total);

        let boot_start = range.carve(BOOT_REGION_SIZE);
        let boot = CodeRegion::new(boot_start, BOOT_REGION_SIZE);
        let baseline =
            SemiSpaceCodeRegion::new(self.options.baseline_half_size(), &mut range);
        let opt_start = range.carve(self.options.reserved_opt_code_cache_size);
        let opt = CodeRegion::new(opt_start, self.options.reserved_opt_code_cache_size);

        CodeCache {
            options: self.options,
            _address_range: range,
            boot,
            baseline,
            opt,
            root_table: RootTable::new(),
            safepoint: self.safepoint,
            alloc_mutex: Mutex::new(()),
            baseline_alloc_count: AtomicUsize::new(0),
        }
    }
}
