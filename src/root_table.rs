//! The boot → baseline root set: direct-call sites in the immortal boot
//! region whose target lives in the mobile baseline region, and therefore
//! must be rewritten on every eviction that relocates the callee.

use crate::util::address::Address;
use std::sync::Mutex;

/// One inbound root: the location of the call's 32-bit displacement field,
/// and the baseline address it currently resolves to. `target` is whatever
/// the relocation map says the callee currently lives at — before the first
/// eviction that's wherever the callee was originally allocated, and after
/// each eviction it's updated to the callee's new address.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Root {
    pub call_site: Address,
    pub target: Address,
}

/// Initial backing capacity, per the specification. Doubled on overflow,
/// never shrunk.
const INITIAL_CAPACITY: usize = 10;

/// A growable, thread-safe vector of [`Root`]s. Entries are appended under
/// the cache-wide mutex by `recordBootToBaseline`; the whole table is only
/// ever walked from inside the eviction safepoint, where no other thread is
/// appending.
#[derive(Debug)]
pub struct RootTable {
    entries: Mutex<Vec<Root>>,
}

impl RootTable {
    pub fn new() -> Self {
        RootTable {
            entries: Mutex::new(Vec::with_capacity(INITIAL_CAPACITY)),
        }
    }

    /// Appends `root`. The caller is responsible for deduplication if it
    /// cares — duplicates are permitted but wasteful, never incorrect: a
    /// stale or repeated root just gets rewritten twice to the same target.
    pub fn append(&self, root: Root) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == entries.capacity() {
            let new_capacity = (entries.capacity() * 2).max(INITIAL_CAPACITY);
            entries.reserve_exact(new_capacity - entries.len());
        }
        entries.push(root);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An immutable point-in-time copy, safe to iterate without holding the
    /// table's lock.
    pub fn snapshot(&self) -> Vec<Root> {
        self.entries.lock().unwrap().clone()
    }

    /// Visits every entry, allowing in-place rewriting of its `target`.
    /// Only safe to call where the caller can guarantee no concurrent
    /// appends — i.e. from inside the eviction safepoint.
    pub fn for_each_mut(&self, mut f: impl FnMut(&mut Root)) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            f(entry);
        }
    }
}

impl Default for RootTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: usize) -> Address {
        unsafe { Address::from_usize(n) }
    }

    #[test]
    fn doubles_from_ten() {
        let table = RootTable::new();
        for i in 0..25 {
            table.append(Root {
                call_site: addr(0x1000 + i),
                target: addr(0x2000),
            });
        }
        assert_eq!(table.len(), 25);
        let snapshot = table.snapshot();
        assert_eq!(snapshot.len(), 25);
        assert_eq!(snapshot[0].call_site, addr(0x1000));
    }

    #[test]
    fn for_each_mut_rewrites_targets() {
        let table = RootTable::new();
        table.append(Root {
            call_site: addr(0x1000),
            target: addr(0x2000),
        });
        table.for_each_mut(|root| root.target = addr(0x3000));
        assert_eq!(table.snapshot()[0].target, addr(0x3000));
    }
}
