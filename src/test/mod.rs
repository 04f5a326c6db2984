//! Shared fixtures for unit tests.
//!
//! Small, hand-checkable heaps built with [`MemorySnapshotBuilder`], plus provider
//! wrappers that count calls or trigger cancellation mid-enumeration.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    snapshot::{
        Address, FreeBlock, HeapSnapshotProvider, MemorySnapshot, MemorySnapshotBuilder,
        ObjectRef, RootKind, RootRef,
    },
    utils::CancellationToken,
};

/// Shorthand for [`Address::new`].
pub fn addr(value: u64) -> Address {
    Address::new(value)
}

/// Root `R1` (0x100) -> `O1` (0x200) -> `O2` (0x300) -> `O1`, plus an isolated `O3` (0x400).
pub fn end_to_end_snapshot() -> MemorySnapshot {
    let (r1, o1, o2, o3) = (addr(0x100), addr(0x200), addr(0x300), addr(0x400));
    MemorySnapshotBuilder::new()
        .object(r1, "App.Program", 32)
        .object(o1, "App.Node", 64)
        .object(o2, "App.Node", 64)
        .object(o3, "App.Orphan", 128)
        .reference(r1, o1)
        .reference(o1, o2)
        .reference(o2, o1)
        .root(r1, RootKind::Stack)
        .build()
}

/// Seven types of one object each, sized 100..=700 bytes.
pub fn seven_types_snapshot() -> MemorySnapshot {
    let mut builder = MemorySnapshotBuilder::new();
    for i in 1..=7u64 {
        builder = builder.object(addr(i * 0x1000), format!("Type{i}"), i * 100);
    }
    builder.build()
}

/// A static root holding a cache list that holds `count` entries of `type_name`.
pub fn static_cache_snapshot(type_name: &str, count: u64, entry_size: u64) -> MemorySnapshot {
    let (holder, list) = (addr(0x10), addr(0x20));
    let mut builder = MemorySnapshotBuilder::new()
        .object(holder, "App.Registry", 24)
        .object(list, "System.Collections.Generic.List<App.Entry>", 40)
        .reference(holder, list)
        .root(holder, RootKind::StaticVariable);
    for i in 0..count {
        let entry = addr(0x1_0000 + i * 0x100);
        builder = builder
            .object(entry, type_name, entry_size)
            .reference(list, entry);
    }
    builder.build()
}

/// Stack root `0x1` holding a chain `0x1 -> 0x2 -> ... -> len`, every link `size` bytes.
pub fn chain_snapshot(len: u64, size: u64) -> MemorySnapshot {
    let mut builder = MemorySnapshotBuilder::new()
        .object(addr(1), "App.Head", size)
        .root(addr(1), RootKind::Stack);
    for i in 2..=len {
        builder = builder
            .object(addr(i), "App.Link", size)
            .reference(addr(i - 1), addr(i));
    }
    builder.build()
}

/// Wraps a provider and counts how often each primitive is called.
pub struct CountingSnapshot<P> {
    inner: P,
    get_object_calls: AtomicUsize,
    reference_enumerations: AtomicUsize,
    root_enumerations: AtomicUsize,
}

impl<P: HeapSnapshotProvider> CountingSnapshot<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            get_object_calls: AtomicUsize::new(0),
            reference_enumerations: AtomicUsize::new(0),
            root_enumerations: AtomicUsize::new(0),
        }
    }

    pub fn get_object_calls(&self) -> usize {
        self.get_object_calls.load(Ordering::SeqCst)
    }

    pub fn reference_enumerations(&self) -> usize {
        self.reference_enumerations.load(Ordering::SeqCst)
    }

    pub fn root_enumerations(&self) -> usize {
        self.root_enumerations.load(Ordering::SeqCst)
    }
}

impl<P: HeapSnapshotProvider> HeapSnapshotProvider for CountingSnapshot<P> {
    fn can_walk(&self) -> bool {
        self.inner.can_walk()
    }

    fn enumerate_objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        self.inner.enumerate_objects()
    }

    fn get_object(&self, address: Address) -> Option<ObjectRef> {
        self.get_object_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_object(address)
    }

    fn enumerate_references(&self, address: Address) -> impl Iterator<Item = Address> + '_ {
        self.reference_enumerations.fetch_add(1, Ordering::SeqCst);
        self.inner.enumerate_references(address)
    }

    fn enumerate_roots(&self) -> impl Iterator<Item = RootRef> + '_ {
        self.root_enumerations.fetch_add(1, Ordering::SeqCst);
        self.inner.enumerate_roots()
    }

    fn try_get_generation(&self, address: Address) -> Option<u32> {
        self.inner.try_get_generation(address)
    }

    fn enumerate_free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        self.inner.enumerate_free_blocks()
    }

    fn heap_size(&self) -> Option<u64> {
        self.inner.heap_size()
    }
}

/// A synthetic heap of `total` objects that cancels `token` once `cancel_after`
/// objects have been yielded.
///
/// Objects are generated lazily, so a huge `total` costs nothing unless enumerated.
pub struct CancellingSnapshot {
    pub total: u64,
    pub cancel_after: u64,
    pub token: CancellationToken,
    pub yielded: AtomicUsize,
}

impl CancellingSnapshot {
    pub fn new(total: u64, cancel_after: u64, token: CancellationToken) -> Self {
        Self {
            total,
            cancel_after,
            token,
            yielded: AtomicUsize::new(0),
        }
    }

    pub fn yielded(&self) -> usize {
        self.yielded.load(Ordering::SeqCst)
    }
}

impl HeapSnapshotProvider for CancellingSnapshot {
    fn can_walk(&self) -> bool {
        true
    }

    fn enumerate_objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        (1..=self.total).map(move |i| {
            self.yielded.fetch_add(1, Ordering::SeqCst);
            if i > self.cancel_after {
                self.token.cancel();
            }
            ObjectRef {
                address: addr(i * 0x10),
                type_name: Some(format!("Synthetic{}", i % 7)),
                size: 16,
                generation: None,
            }
        })
    }

    fn get_object(&self, _address: Address) -> Option<ObjectRef> {
        None
    }

    fn enumerate_references(&self, _address: Address) -> impl Iterator<Item = Address> + '_ {
        std::iter::empty()
    }

    fn enumerate_roots(&self) -> impl Iterator<Item = RootRef> + '_ {
        std::iter::empty()
    }
}
