//! Typed, environment-driven configuration for the code cache.
//!
//! Mirrors the teacher crate's `Options`/`MMTKBuilder` split: a plain data
//! struct with documented defaults, populated either programmatically or by
//! reading `CODECACHE_*` environment variables, and consumed once at cache
//! construction time.

use crate::util::constants::BYTES_IN_MBYTE;
use std::env;

/// Default size of the semi-space baseline region (both halves combined).
pub const DEFAULT_BASELINE_CODE_CACHE_SIZE: usize = 128 * BYTES_IN_MBYTE;
/// Default size of the append-only opt region.
pub const DEFAULT_OPT_CODE_CACHE_SIZE: usize = 16 * BYTES_IN_MBYTE;

/// Configuration recognised by the code cache. Field names match the option
/// names in the specification so that `read_env_var_settings` can derive the
/// environment variable name mechanically (`CODECACHE_<NAME>`).
#[derive(Clone, Debug)]
pub struct CodeCacheOptions {
    /// Total bytes for the semi-space baseline region; each half is half
    /// this value.
    pub reserved_baseline_code_cache_size: usize,
    /// Total bytes for the append-only opt region.
    pub reserved_opt_code_cache_size: usize,
    /// If positive, force an eviction on every Nth baseline allocation.
    /// Used by the test harness to exercise the eviction path deterministically.
    pub code_cache_contention_frequency: usize,
    /// Emit a per-bundle trace line on allocation.
    pub trace_code_allocation: bool,
    /// Assert reference-map consistency at runtime entry points. The core
    /// does not act on this itself; it is read by the surrounding runtime.
    pub verify_ref_maps: bool,
}

impl Default for CodeCacheOptions {
    fn default() -> Self {
        CodeCacheOptions {
            reserved_baseline_code_cache_size: DEFAULT_BASELINE_CODE_CACHE_SIZE,
            reserved_opt_code_cache_size: DEFAULT_OPT_CODE_CACHE_SIZE,
            code_cache_contention_frequency: 0,
            trace_code_allocation: false,
            verify_ref_maps: false,
        }
    }
}

impl CodeCacheOptions {
    /// Overrides defaults with any `CODECACHE_*` environment variables that
    /// are set and well-formed. Malformed values are logged and ignored,
    /// leaving the previous value (default or programmatically-set) in place.
    pub fn read_env_var_settings(&mut self) {
        self.read_usize_env("CODECACHE_RESERVED_BASELINE_CODE_CACHE_SIZE", |opts, v| {
            opts.reserved_baseline_code_cache_size = v
        });
        self.read_usize_env("CODECACHE_RESERVED_OPT_CODE_CACHE_SIZE", |opts, v| {
            opts.reserved_opt_code_cache_size = v
        });
        self.read_usize_env("CODECACHE_CODE_CACHE_CONTENTION_FREQUENCY", |opts, v| {
            opts.code_cache_contention_frequency = v
        });
        self.read_bool_env("CODECACHE_TRACE_CODE_ALLOCATION", |opts, v| {
            opts.trace_code_allocation = v
        });
        self.read_bool_env("CODECACHE_VERIFY_REF_MAPS", |opts, v| opts.verify_ref_maps = v);
    }

    fn read_usize_env(&mut self, name: &str, apply: impl FnOnce(&mut Self, usize)) {
        if let Ok(raw) = env::var(name) {
            match raw.parse::<usize>() {
                Ok(v) => apply(self, v),
                Err(_) => log::warn!("ignoring malformed {name}={raw}"),
            }
        }
    }

    fn read_bool_env(&mut self, name: &str, apply: impl FnOnce(&mut Self, bool)) {
        if let Ok(raw) = env::var(name) {
            match raw.as_str() {
                "true" | "1" => apply(self, true),
                "false" | "0" => apply(self, false),
                _ => log::warn!("ignoring malformed {name}={raw}"),
            }
        }
    }

    /// Size of each half of the semi-space baseline region.
    pub fn baseline_half_size(&self) -> usize {
        self.reserved_baseline_code_cache_size / 2
    }
}
