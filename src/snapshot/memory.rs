//! In-memory heap snapshot.
//!
//! [`MemorySnapshot`] is a frozen, fully materialized heap: every object, reference,
//! root and free block lives in ordered maps. It is the provider used when a caller has
//! already decoded a dump into plain data, and it backs the fixtures of this crate's
//! tests.
//!
//! Snapshots are assembled with [`MemorySnapshotBuilder`] and cannot be modified after
//! [`MemorySnapshotBuilder::build`].
//!
//! # Examples
//!
//! ```rust
//! use heapscope::snapshot::{Address, HeapSnapshotProvider, MemorySnapshotBuilder, RootKind};
//!
//! let root = Address::new(0x1000);
//! let child = Address::new(0x2000);
//!
//! let snapshot = MemorySnapshotBuilder::new()
//!     .object(root, "App.Cache", 48)
//!     .object(child, "System.Byte[]", 4096)
//!     .reference(root, child)
//!     .root(root, RootKind::StaticVariable)
//!     .build();
//!
//! assert!(snapshot.can_walk());
//! assert_eq!(snapshot.enumerate_references(root).collect::<Vec<_>>(), vec![child]);
//! ```

use std::collections::BTreeMap;

use crate::snapshot::{Address, FreeBlock, HeapSnapshotProvider, ObjectRef, RootKind, RootRef};

#[derive(Clone, Debug)]
struct MemoryObject {
    type_name: Option<String>,
    size: u64,
    generation: Option<u32>,
    references: Vec<Address>,
}

/// A frozen heap held entirely in memory.
///
/// Objects are enumerated in ascending address order, which makes every analysis over
/// a `MemorySnapshot` deterministic.
#[derive(Clone, Debug)]
pub struct MemorySnapshot {
    objects: BTreeMap<Address, MemoryObject>,
    roots: Vec<RootRef>,
    free_blocks: Vec<FreeBlock>,
    heap_size: Option<u64>,
    walkable: bool,
}

impl MemorySnapshot {
    /// Returns the number of objects in the snapshot.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Returns the number of reference edges in the snapshot.
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.objects.values().map(|obj| obj.references.len()).sum()
    }
}

impl HeapSnapshotProvider for MemorySnapshot {
    fn can_walk(&self) -> bool {
        self.walkable
    }

    fn enumerate_objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.objects.iter().map(|(&address, obj)| ObjectRef {
            address,
            type_name: obj.type_name.clone(),
            size: obj.size,
            generation: obj.generation,
        })
    }

    fn get_object(&self, address: Address) -> Option<ObjectRef> {
        self.objects.get(&address).map(|obj| ObjectRef {
            address,
            type_name: obj.type_name.clone(),
            size: obj.size,
            generation: obj.generation,
        })
    }

    fn enumerate_references(&self, address: Address) -> impl Iterator<Item = Address> + '_ {
        self.objects
            .get(&address)
            .map(|obj| obj.references.as_slice())
            .unwrap_or_default()
            .iter()
            .copied()
    }

    fn enumerate_roots(&self) -> impl Iterator<Item = RootRef> + '_ {
        self.roots.iter().copied()
    }

    fn try_get_generation(&self, address: Address) -> Option<u32> {
        self.objects.get(&address).and_then(|obj| obj.generation)
    }

    fn enumerate_free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        self.free_blocks.iter().copied()
    }

    fn heap_size(&self) -> Option<u64> {
        self.heap_size
    }
}

/// Builder for [`MemorySnapshot`].
///
/// References may point at addresses that were never added as objects; such targets
/// behave like unresolvable objects during analysis.
#[derive(Debug)]
pub struct MemorySnapshotBuilder {
    objects: BTreeMap<Address, MemoryObject>,
    roots: Vec<RootRef>,
    free_blocks: Vec<FreeBlock>,
    heap_size: Option<u64>,
    walkable: bool,
}

impl MemorySnapshotBuilder {
    /// Creates an empty, walkable snapshot builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            roots: Vec::new(),
            free_blocks: Vec::new(),
            heap_size: None,
            walkable: true,
        }
    }

    /// Adds an object with a resolved type name.
    ///
    /// Adding the same address twice replaces the type and size but keeps the
    /// references recorded so far.
    #[must_use]
    pub fn object(mut self, address: Address, type_name: impl Into<String>, size: u64) -> Self {
        self.insert_object(address, Some(type_name.into()), size);
        self
    }

    /// Adds an object whose type cannot be resolved.
    #[must_use]
    pub fn untyped_object(mut self, address: Address, size: u64) -> Self {
        self.insert_object(address, None, size);
        self
    }

    /// Records the GC generation of an already added object.
    #[must_use]
    pub fn generation(mut self, address: Address, generation: u32) -> Self {
        if let Some(obj) = self.objects.get_mut(&address) {
            obj.generation = Some(generation);
        }
        self
    }

    /// Adds an outgoing reference from `from` to `to`.
    ///
    /// References from addresses that are not objects are dropped.
    #[must_use]
    pub fn reference(mut self, from: Address, to: Address) -> Self {
        if let Some(obj) = self.objects.get_mut(&from) {
            obj.references.push(to);
        }
        self
    }

    /// Adds a non-pinned GC root.
    #[must_use]
    pub fn root(self, address: Address, kind: RootKind) -> Self {
        self.root_with_pinning(address, kind, false)
    }

    /// Adds a pinned GC root.
    #[must_use]
    pub fn pinned_root(self, address: Address, kind: RootKind) -> Self {
        self.root_with_pinning(address, kind, true)
    }

    /// Adds a GC root with explicit pinning.
    #[must_use]
    pub fn root_with_pinning(mut self, address: Address, kind: RootKind, is_pinned: bool) -> Self {
        self.roots.push(RootRef {
            address,
            kind,
            is_pinned,
        });
        self
    }

    /// Adds a free region.
    #[must_use]
    pub fn free_block(mut self, address: Address, size: u64) -> Self {
        self.free_blocks.push(FreeBlock { address, size });
        self
    }

    /// Sets the committed heap size reported by the snapshot.
    #[must_use]
    pub fn heap_size(mut self, size: u64) -> Self {
        self.heap_size = Some(size);
        self
    }

    /// Marks the snapshot as not walkable (e.g. captured mid-GC).
    #[must_use]
    pub fn not_walkable(mut self) -> Self {
        self.walkable = false;
        self
    }

    /// Freezes the builder into a [`MemorySnapshot`].
    #[must_use]
    pub fn build(self) -> MemorySnapshot {
        MemorySnapshot {
            objects: self.objects,
            roots: self.roots,
            free_blocks: self.free_blocks,
            heap_size: self.heap_size,
            walkable: self.walkable,
        }
    }

    fn insert_object(&mut self, address: Address, type_name: Option<String>, size: u64) {
        let entry = self.objects.entry(address).or_insert_with(|| MemoryObject {
            type_name: None,
            size: 0,
            generation: None,
            references: Vec::new(),
        });
        entry.type_name = type_name;
        entry.size = size;
    }
}

impl Default for MemorySnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
