//! The single contiguous virtual-memory window that every region — boot,
//! baseline, opt — is carved out of, so that any two bundles anywhere in
//! the cache are mutually reachable by a 32-bit PC-relative displacement.

use crate::util::address::Address;
use crate::util::memory;
use static_assertions::const_assert;

/// The largest window the cache will ever reserve: the magnitude of a
/// signed 32-bit displacement. A window any larger could place two bundles
/// farther apart than a direct call can encode, which the specification
/// calls a build-time sizing bug (`FatalError::DisplacementOverflow`) if it
/// is ever hit in practice; `AddressRange::reserve` refuses to construct a
/// window that makes the bug unconditionally possible.
pub const MAX_WINDOW_BYTES: usize = i32::MAX as usize;

const_assert!(MAX_WINDOW_BYTES < usize::MAX);

/// Owns one `mmap` reservation and hands out non-overlapping sub-windows
/// from it by simple bump allocation of offsets. Sub-windows are never
/// released individually; the whole range is unmapped together when the
/// cache (a process singleton) would otherwise be dropped, which in
/// practice is never, since the cache lives for the life of the process.
#[derive(Debug)]
pub struct AddressRange {
    start: Address,
    size: usize,
    next_offset: usize,
}

impl AddressRange {
    /// Reserves a window of `size` bytes. `size` must not exceed
    /// [`MAX_WINDOW_BYTES`], or no layout of regions inside it could ever
    /// guarantee the 32-bit reachability invariant.
    pub fn reserve(size: usize) -> AddressRange {
        assert!(
            size <= MAX_WINDOW_BYTES,
            "requested code cache window of {size} bytes exceeds the 32-bit reachability limit of {MAX_WINDOW_BYTES} bytes"
        );
        let start = unsafe { memory::mmap_reserve(size) }
            .unwrap_or_else(|e| panic!("failed to reserve {size} bytes for the code cache: {e}"));
        AddressRange {
            start,
            size,
            next_offset: 0,
        }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.start + self.size
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Carves out the next `len` bytes of the window and returns their
    /// start address. Only called during cache construction, never after.
    pub fn carve(&mut self, len: usize) -> Address {
        assert!(
            self.next_offset + len <= self.size,
            "code cache sub-region layout overflows the reserved window"
        );
        let addr = self.start + self.next_offset;
        self.next_offset += len;
        addr
    }
}

impl Drop for AddressRange {
    fn drop(&mut self) {
        unsafe { memory::munmap(self.start, self.size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carve_returns_disjoint_sub_windows() {
        let mut range = AddressRange::reserve(64 * 1024);
        let a = range.carve(4096);
        let b = range.carve(8192);
        assert_eq!(a, range.start());
        assert_eq!(b, a + 4096);
    }

    #[test]
    #[should_panic(expected = "exceeds the 32-bit reachability limit")]
    fn refuses_oversized_window() {
        let _ = AddressRange::reserve(MAX_WINDOW_BYTES + 1);
    }
}
