//! Forward and backward reference index over the reachable heap.
//!
//! [`ObjectGraphIndex`] materializes the object graph reachable from a root set into
//! explicit adjacency maps. Heap providers can only answer "what does this object
//! reference?"; questions like "who keeps this object alive?" need the reverse map,
//! which can only be built by walking the reachable heap once.
//!
//! # Construction
//!
//! The index is built by breadth-first traversal from the given roots:
//!
//! 1. Dequeue an address and skip it if it was already visited
//! 2. Resolve the object; unresolvable objects are recorded with no outgoing edges
//! 3. Enumerate outgoing references, dropping null and duplicate targets
//! 4. Record the forward edge, the reverse edge and bump the target's reference count
//! 5. Enqueue every target that has not been visited yet
//!
//! Every address is visited at most once, so self references and cycles never requeue
//! endlessly. Cancellation is polled once per dequeued address.
//!
//! # Immutability
//!
//! All maps are ordered and the index exposes only `&self` queries. Building twice from
//! the same frozen snapshot and root set yields equal indexes.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::{
    graph::{GraphBase, Predecessors, RootedGraph, Successors},
    snapshot::{Address, HeapSnapshotProvider},
    utils::CancellationToken,
    Result,
};

/// Reference adjacency maps of the subgraph reachable from a root set.
///
/// # Examples
///
/// ```rust
/// use heapscope::{
///     graph::ObjectGraphIndex,
///     snapshot::{Address, MemorySnapshotBuilder, RootKind},
///     utils::CancellationToken,
/// };
///
/// let (a, b) = (Address::new(0x10), Address::new(0x20));
/// let snapshot = MemorySnapshotBuilder::new()
///     .object(a, "Owner", 32)
///     .object(b, "Owned", 64)
///     .reference(a, b)
///     .root(a, RootKind::Stack)
///     .build();
///
/// let index = ObjectGraphIndex::build(&snapshot, [a], &CancellationToken::new())?;
/// assert_eq!(index.forward_references_of(a), &[b]);
/// assert_eq!(index.back_references_of(b), &[a]);
/// assert_eq!(index.reference_count_of(b), 1);
/// # Ok::<(), heapscope::Error>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectGraphIndex {
    /// source -> referenced objects, deduplicated, in enumeration order
    forward: BTreeMap<Address, Vec<Address>>,
    /// target -> referencing objects, in discovery order
    back: BTreeMap<Address, Vec<Address>>,
    /// target -> number of distinct referencing objects
    ref_counts: BTreeMap<Address, usize>,
    roots: BTreeSet<Address>,
    invalid: usize,
    truncated: bool,
}

impl ObjectGraphIndex {
    /// Builds the index of everything reachable from `roots`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SnapshotNotReady`] if the heap cannot be walked, or
    /// [`crate::Error::Cancelled`] if `cancel` fires during traversal.
    pub fn build<P, I>(snapshot: &P, roots: I, cancel: &CancellationToken) -> Result<Self>
    where
        P: HeapSnapshotProvider,
        I: IntoIterator<Item = Address>,
    {
        Self::build_bounded(snapshot, roots, None, cancel)
    }

    /// Builds the index, visiting at most `max_nodes` objects.
    ///
    /// When the bound is reached the traversal stops and the index is flagged as
    /// truncated (see [`is_truncated`](ObjectGraphIndex::is_truncated)); the maps remain
    /// consistent for the visited part of the graph.
    ///
    /// # Errors
    ///
    /// Same as [`build`](ObjectGraphIndex::build).
    pub fn build_bounded<P, I>(
        snapshot: &P,
        roots: I,
        max_nodes: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<Self>
    where
        P: HeapSnapshotProvider,
        I: IntoIterator<Item = Address>,
    {
        if !snapshot.can_walk() {
            return Err(not_ready_error!("cannot walk the managed heap"));
        }

        let mut index = ObjectGraphIndex {
            roots: roots.into_iter().filter(|addr| !addr.is_null()).collect(),
            ..ObjectGraphIndex::default()
        };

        let mut visited: HashSet<Address> = HashSet::new();
        let mut queue: VecDeque<Address> = index.roots.iter().copied().collect();

        while let Some(address) = queue.pop_front() {
            cancel.check()?;

            if visited.contains(&address) {
                continue;
            }
            if max_nodes.is_some_and(|max| visited.len() >= max) {
                index.truncated = true;
                break;
            }
            visited.insert(address);

            if snapshot.get_object(address).is_none() {
                log::trace!("Skipping unresolvable object {address}");
                index.invalid += 1;
                index.forward.insert(address, Vec::new());
                continue;
            }

            let mut targets = Vec::new();
            let mut seen = HashSet::new();
            for child in snapshot.enumerate_references(address) {
                if child.is_null() || !seen.insert(child) {
                    continue;
                }

                targets.push(child);
                index.back.entry(child).or_default().push(address);
                *index.ref_counts.entry(child).or_insert(0) += 1;

                if !visited.contains(&child) {
                    queue.push_back(child);
                }
            }

            index.forward.insert(address, targets);
        }

        log::debug!(
            "Graph built: {} objects analyzed, {} edges, {} unresolvable{}",
            index.forward.len(),
            index.edge_count(),
            index.invalid,
            if index.truncated { " (truncated)" } else { "" }
        );

        Ok(index)
    }

    /// Returns the objects referenced by `address`.
    ///
    /// Empty for unvisited, unresolvable or leaf objects.
    #[must_use]
    pub fn forward_references_of(&self, address: Address) -> &[Address] {
        self.forward.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the objects referencing `address`.
    #[must_use]
    pub fn back_references_of(&self, address: Address) -> &[Address] {
        self.back.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns how many distinct objects reference `address`.
    #[must_use]
    pub fn reference_count_of(&self, address: Address) -> usize {
        self.ref_counts.get(&address).copied().unwrap_or(0)
    }

    /// Returns `true` if `address` was visited while building the index.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.forward.contains_key(&address)
    }

    /// Returns the root set the index was built from.
    #[must_use]
    pub fn root_set(&self) -> &BTreeSet<Address> {
        &self.roots
    }

    /// Returns the number of visited objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.forward.len()
    }

    /// Returns the number of recorded reference edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }

    /// Returns how many visited addresses could not be resolved.
    #[must_use]
    pub fn invalid_object_count(&self) -> usize {
        self.invalid
    }

    /// Returns `true` if construction stopped at its node bound.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Returns the objects referenced by more than `threshold` distinct objects,
    /// sorted by descending reference count.
    #[must_use]
    pub fn most_referenced(&self, threshold: usize) -> Vec<(Address, usize)> {
        let mut hot: Vec<(Address, usize)> = self
            .ref_counts
            .iter()
            .filter(|(_, &count)| count > threshold)
            .map(|(&addr, &count)| (addr, count))
            .collect();
        hot.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hot
    }
}

impl GraphBase for ObjectGraphIndex {
    fn node_count(&self) -> usize {
        self.forward.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = Address> {
        self.forward.keys().copied()
    }
}

impl Successors for ObjectGraphIndex {
    fn successors(&self, node: Address) -> impl Iterator<Item = Address> {
        self.forward_references_of(node).iter().copied()
    }
}

impl Predecessors for ObjectGraphIndex {
    fn predecessors(&self, node: Address) -> impl Iterator<Item = Address> {
        self.back_references_of(node).iter().copied()
    }
}

impl RootedGraph for ObjectGraphIndex {
    fn roots(&self) -> impl Iterator<Item = Address> {
        self.roots.iter().copied()
    }

    fn is_root(&self, node: Address) -> bool {
        self.roots.contains(&node)
    }
}
