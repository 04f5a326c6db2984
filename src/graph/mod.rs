//! Object reference graph.
//!
//! This module turns the per-object reference enumeration of a
//! [`HeapSnapshotProvider`](crate::snapshot::HeapSnapshotProvider) into an explicit,
//! immutable graph ([`ObjectGraphIndex`]) and provides the algorithms that query it.
//!
//! # Key Components
//!
//! - [`ObjectGraphIndex`] - Forward/back adjacency maps and reference counts
//! - [`GraphBase`], [`Successors`], [`Predecessors`], [`RootedGraph`] - Read-only graph
//!   views the algorithms are written against
//! - [`algorithms`] - Reachability, root paths and cycle detection

pub mod algorithms;
mod index;
mod traits;

pub use index::ObjectGraphIndex;
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
