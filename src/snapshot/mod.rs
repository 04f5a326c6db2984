//! Heap snapshot abstraction consumed by every analysis in this crate.
//!
//! Acquiring and parsing a heap dump is not this crate's job. Instead, the analysis
//! engine is written against the [`HeapSnapshotProvider`] trait, which exposes the
//! handful of enumeration primitives a frozen managed heap offers: object walking,
//! single-object resolution, outgoing references and GC roots.
//!
//! # Key Components
//!
//! - [`Address`] - Strongly-typed object address
//! - [`ObjectRef`] - A resolved object (type name, shallow size, optional generation)
//! - [`RootRef`] / [`RootKind`] - GC root enumeration entries
//! - [`FreeBlock`] - Free space reported by providers that can walk segments
//! - [`HeapSnapshotProvider`] - The collaborator contract
//! - [`MemorySnapshot`] - A frozen, in-memory provider built with [`MemorySnapshotBuilder`]
//!
//! # Frozen Snapshots
//!
//! Every traversal assumes the snapshot does not change for the duration of a query.
//! Providers are only ever accessed through `&self`; the analysis session takes the
//! provider by value so nothing else can mutate it while queries run.
//!
//! # Optional Capabilities
//!
//! Not every heap source can report object generations, free blocks or an authoritative
//! heap size. These are modeled as trait methods with defaults reporting "not available"
//! ([`HeapSnapshotProvider::try_get_generation`] returns `None`), so absence is an ordinary
//! outcome rather than an error.

mod memory;

pub use memory::{MemorySnapshot, MemorySnapshotBuilder};

use std::fmt;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumCount, EnumIter};

/// Address of an object inside a heap snapshot.
///
/// Addresses are unique within one snapshot. The null address never denotes an
/// object; references to it are ignored by all traversals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    /// The null address.
    pub const NULL: Address = Address(0);

    /// Creates an address from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Returns the raw address value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns `true` for the null address.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// A resolved heap object.
///
/// `type_name` is `None` when the provider could not resolve the object's type; such
/// objects are still counted (under the `Unknown` bucket) rather than dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    /// Address of the object
    pub address: Address,
    /// Fully-qualified type name, if resolvable
    pub type_name: Option<String>,
    /// Shallow size in bytes
    pub size: u64,
    /// GC generation, if the provider exposes it
    pub generation: Option<u32>,
}

impl ObjectRef {
    /// Bucket name used for objects whose type could not be resolved.
    pub const UNKNOWN_TYPE: &'static str = "Unknown";

    /// Returns the type name, or [`ObjectRef::UNKNOWN_TYPE`].
    #[must_use]
    pub fn type_name_or_unknown(&self) -> &str {
        self.type_name.as_deref().unwrap_or(Self::UNKNOWN_TYPE)
    }
}

/// Category of a GC root.
///
/// The display form is the variant name; the leak classifier looks for `Static`
/// in rendered retention paths, which `StaticVariable` roots produce.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, EnumCount, Serialize,
)]
pub enum RootKind {
    /// A local variable or register in a thread's stack frame
    Stack,
    /// A static field
    StaticVariable,
    /// A strong GC handle
    StrongHandle,
    /// A pinned GC handle
    PinnedHandle,
    /// An async-pinned handle (overlapped I/O buffers)
    AsyncPinnedHandle,
    /// A weak handle (does not keep its target alive, but is still reported)
    WeakHandle,
    /// A ref-counted handle (COM interop)
    RefCountedHandle,
    /// A dependent handle
    DependentHandle,
    /// An object waiting on the finalizer queue
    FinalizerQueue,
    /// Any root category the provider cannot classify
    Other,
}

/// An entry of the GC root enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RootRef {
    /// Address of the rooted object
    pub address: Address,
    /// Root category
    pub kind: RootKind,
    /// Whether the root pins its object in place
    pub is_pinned: bool,
}

/// A contiguous free region of the heap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FreeBlock {
    /// Start of the free region
    pub address: Address,
    /// Size of the free region in bytes
    pub size: u64,
}

/// Enumeration primitives over a frozen managed heap.
///
/// This is the only contract the analysis engine needs from a heap source. All
/// iterators are finite and one-shot per call; calling an `enumerate_*` method again
/// starts a fresh enumeration.
///
/// # Required Methods
///
/// - [`can_walk`](HeapSnapshotProvider::can_walk) - Must be `true` before any traversal
/// - [`enumerate_objects`](HeapSnapshotProvider::enumerate_objects) - All live objects
/// - [`get_object`](HeapSnapshotProvider::get_object) - Resolve a single address
/// - [`enumerate_references`](HeapSnapshotProvider::enumerate_references) - Outgoing references
/// - [`enumerate_roots`](HeapSnapshotProvider::enumerate_roots) - GC roots
///
/// # Optional Capabilities
///
/// - [`try_get_generation`](HeapSnapshotProvider::try_get_generation)
/// - [`enumerate_free_blocks`](HeapSnapshotProvider::enumerate_free_blocks)
/// - [`heap_size`](HeapSnapshotProvider::heap_size)
pub trait HeapSnapshotProvider {
    /// Returns `true` if the heap is in a consistent, walkable state.
    fn can_walk(&self) -> bool;

    /// Enumerates every live object on the heap.
    fn enumerate_objects(&self) -> impl Iterator<Item = ObjectRef> + '_;

    /// Resolves a single address.
    ///
    /// Returns `None` when the address does not denote a valid object. Callers must
    /// treat `None` as "invalid object", never as a zero-sized one.
    fn get_object(&self, address: Address) -> Option<ObjectRef>;

    /// Enumerates the outgoing references of the object at `address`.
    ///
    /// For invalid addresses the iterator is empty.
    fn enumerate_references(&self, address: Address) -> impl Iterator<Item = Address> + '_;

    /// Enumerates GC roots.
    fn enumerate_roots(&self) -> impl Iterator<Item = RootRef> + '_;

    /// Returns the GC generation of an object, if the provider can determine it.
    fn try_get_generation(&self, _address: Address) -> Option<u32> {
        None
    }

    /// Enumerates free regions of the heap, if the provider can walk segments.
    fn enumerate_free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        std::iter::empty()
    }

    /// Returns the committed heap size, if known.
    ///
    /// When `None`, analyses fall back to the sum of live object sizes.
    fn heap_size(&self) -> Option<u64> {
        None
    }
}
