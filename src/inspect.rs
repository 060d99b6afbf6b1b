//! Two side-effect-free signal points the external debugger breakpoints.
//!
//! Both functions must keep a stable address and must never be inlined or
//! relocated, so the debugger can plant a breakpoint on their entry and rely
//! on it firing exactly once per eviction, with the region snapshot in a
//! known state: unmodified on `notify_eviction_started`, post-flip on
//! `notify_eviction_completed`. `#[inline(never)]` is necessary but not
//! sufficient for that guarantee in general; a real embedding additionally
//! pins these into the immortal boot region so later recompilation of the
//! cache's own code cannot move them.

/// Called once, synchronously, immediately before the mark phase of an
/// eviction begins.
#[inline(never)]
pub fn notify_eviction_started() {}

/// Called once, synchronously, immediately after the from/to flip of an
/// eviction completes.
#[inline(never)]
pub fn notify_eviction_completed() {}
