//! Thin wrapper over anonymous `mmap`/`munmap`, grounded on the teacher's
//! `util::os::posix_common` helpers.

use crate::util::address::Address;
use std::io;

/// Reserves `size` bytes of anonymous, private memory with read/write/exec
/// permissions and returns its start address. The mapping is not
/// `MAP_FIXED` — the kernel is free to place it anywhere, which is fine
/// because every address the cache hands out is relative to this base, not
/// to a requested fixed address; the 32-bit reachability invariant is
/// enforced by [`crate::region::AddressRange`] sizing the whole window
/// small enough to fit, not by where the OS happens to place it.
///
/// # Safety
/// The caller is responsible for calling [`unmap`] with the same `size`
/// exactly once, and for not accessing the returned range after doing so.
pub unsafe fn mmap_reserve(size: usize) -> io::Result<Address> {
    let ptr = libc::mmap(
        std::ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
        libc::MAP_PRIVATE | libc::MAP_ANON,
        -1,
        0,
    );
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { Address::from_usize(ptr as usize) })
}

/// Releases a mapping previously returned by [`mmap_reserve`].
///
/// # Safety
/// `start`/`size` must exactly match a prior, still-live [`mmap_reserve`]
/// call, and nothing may access the range afterwards.
pub unsafe fn munmap(start: Address, size: usize) {
    let result = unsafe { libc::munmap(start.to_mut_ptr(), size) };
    assert_eq!(result, 0, "failed to unmap code cache region at {start}");
}
