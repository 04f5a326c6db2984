//! GC root table.

use std::collections::BTreeMap;

use crate::{
    snapshot::{Address, HeapSnapshotProvider, RootKind},
    utils::CancellationToken,
    Result,
};

/// Snapshot of the GC root enumeration, keyed by rooted object.
///
/// Providers may report the same object through several roots; the first reported
/// kind is kept for labeling while every pinned entry is counted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootTable {
    kinds: BTreeMap<Address, RootKind>,
    entries: usize,
    pinned: usize,
}

impl RootTable {
    /// Enumerates the roots of `snapshot` once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SnapshotNotReady`] if the heap cannot be walked, or
    /// [`crate::Error::Cancelled`] if `cancel` fires.
    pub fn collect<P: HeapSnapshotProvider>(
        snapshot: &P,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        if !snapshot.can_walk() {
            return Err(not_ready_error!("cannot enumerate GC roots"));
        }

        let mut table = RootTable::default();
        for root in snapshot.enumerate_roots() {
            cancel.check()?;

            table.entries += 1;
            if root.is_pinned {
                table.pinned += 1;
            }
            if !root.address.is_null() {
                table.kinds.entry(root.address).or_insert(root.kind);
            }
        }

        log::debug!(
            "Collected {} root entries ({} distinct objects, {} pinned)",
            table.entries,
            table.kinds.len(),
            table.pinned
        );
        Ok(table)
    }

    /// Returns the kind of the root holding `address`, if it is rooted.
    #[must_use]
    pub fn kind_of(&self, address: Address) -> Option<RootKind> {
        self.kinds.get(&address).copied()
    }

    /// Returns the distinct rooted addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.kinds.keys().copied()
    }

    /// Number of root entries reported, duplicates included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Number of pinned root entries.
    #[must_use]
    pub fn pinned_count(&self) -> usize {
        self.pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{snapshot::MemorySnapshotBuilder, test::addr};

    #[test]
    fn test_first_kind_wins_and_pins_are_counted() {
        let snapshot = MemorySnapshotBuilder::new()
            .object(addr(0x10), "A", 8)
            .object(addr(0x20), "B", 8)
            .root(addr(0x10), RootKind::StaticVariable)
            .pinned_root(addr(0x10), RootKind::PinnedHandle)
            .pinned_root(addr(0x20), RootKind::AsyncPinnedHandle)
            .root(Address::NULL, RootKind::Stack)
            .build();

        let table = RootTable::collect(&snapshot, &CancellationToken::new()).unwrap();

        assert_eq!(table.kind_of(addr(0x10)), Some(RootKind::StaticVariable));
        assert_eq!(table.kind_of(addr(0x30)), None);
        assert_eq!(table.entry_count(), 4);
        assert_eq!(table.pinned_count(), 2);
        assert_eq!(
            table.addresses().collect::<Vec<_>>(),
            vec![addr(0x10), addr(0x20)]
        );
    }
}
