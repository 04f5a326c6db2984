//! Trait definitions for object-graph abstractions.
//!
//! The traversal algorithms in [`crate::graph::algorithms`] are written against these
//! traits rather than against [`crate::graph::ObjectGraphIndex`] directly, so they can
//! run over any adjacency source keyed by [`Address`].
//!
//! # Architecture
//!
//! - [`GraphBase`] - Node count and node iteration
//! - [`Successors`] - Forward edges (the objects a node references)
//! - [`Predecessors`] - Backward edges (the objects referencing a node)
//! - [`RootedGraph`] - Graphs with a designated set of GC roots
//!
//! All adjacency queries return iterators, so traversals that stop early never
//! allocate the full neighbour list.

use crate::snapshot::Address;

/// Base trait providing core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node addresses.
    ///
    /// Implementations must iterate in a stable order; the algorithms rely on it
    /// for deterministic output.
    fn node_ids(&self) -> impl Iterator<Item = Address>;
}

/// Trait for graphs that support forward edge traversal.
///
/// For a reference `u -> v` (object `u` holds a field pointing at `v`), `v` is a
/// successor of `u`.
pub trait Successors: GraphBase {
    /// Returns an iterator over the objects referenced by `node`.
    ///
    /// Nodes that are not part of the graph have no successors.
    fn successors(&self, node: Address) -> impl Iterator<Item = Address>;
}

/// Trait for graphs that support backward edge traversal.
///
/// For a reference `u -> v`, `u` is a predecessor of `v`: it is one of the objects
/// keeping `v` alive.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the objects referencing `node`.
    fn predecessors(&self, node: Address) -> impl Iterator<Item = Address>;
}

/// Trait for graphs rooted at a set of GC roots.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the root addresses the graph was built from.
    fn roots(&self) -> impl Iterator<Item = Address>;

    /// Returns `true` if `node` is one of the roots.
    fn is_root(&self, node: Address) -> bool;
}
