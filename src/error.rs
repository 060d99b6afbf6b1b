//! The cache's diagnostic channel.
//!
//! The teacher crate does not depend on `anyhow` or `thiserror`; failures
//! that cannot be recovered locally are logged and the process exits
//! (see `plan::nogc::nogccollector::process::exit`). The code cache follows
//! the same convention: recoverable conditions (a region full, once, before
//! eviction; a lookup miss) are plain `Option`s, never `Result`s, and only
//! genuinely fatal conditions get an error type at all.

use std::fmt;

/// The exit code used for every fatal condition the cache can hit. The
/// specification reserves this code for "cache exhausted after eviction";
/// other fatal conditions (a build-time sizing bug, a safepoint imbalance)
/// are programmer errors rather than capacity errors, but since none of them
/// are expected to occur in a correctly sized, correctly used cache, they
/// share the same exit path and code.
pub const FATAL_EXIT_CODE: i32 = 11;

/// Conditions the specification classifies as fatal: local recovery is not
/// possible and the process must terminate with a diagnostic.
#[derive(Debug)]
pub enum FatalError {
    /// The baseline region is still full after one eviction retry.
    BaselineExhausted,
    /// The append-only opt region is full; it is never evicted.
    OptExhausted,
    /// A bundle survived eviction but the relocation map has nowhere left
    /// to place it. This can only happen if `to` is smaller than `from`,
    /// which the cache never allows, so this indicates a construction bug.
    ToSpaceOverflow,
    /// A direct-call displacement could not be encoded in 32 bits after
    /// relocation — the reserved address window is too large for the
    /// target architecture's call encoding.
    DisplacementOverflow { from: crate::util::Address, to: crate::util::Address },
    /// A `SafepointGate` was dropped in a state inconsistent with how it was
    /// entered — entered but never exited, or exited twice.
    SafepointImbalance,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::BaselineExhausted => write!(
                f,
                "baseline code cache exhausted after eviction; raise ReservedBaselineCodeCacheSize"
            ),
            FatalError::OptExhausted => write!(
                f,
                "opt code cache exhausted; raise ReservedOptCodeCacheSize"
            ),
            FatalError::ToSpaceOverflow => {
                write!(f, "survivor bundle does not fit in to-space during eviction")
            }
            FatalError::DisplacementOverflow { from, to } => write!(
                f,
                "direct-call displacement from {from} to {to} does not fit in 32 bits"
            ),
            FatalError::SafepointImbalance => {
                write!(f, "safepoint gate entered and exited an unequal number of times")
            }
        }
    }
}

/// Logs `err` to the process-level diagnostic channel and terminates the
/// process. This function never returns.
pub fn report_and_exit(err: FatalError) -> ! {
    log::error!("{err}");
    std::process::exit(FATAL_EXIT_CODE)
}
