//! Graph algorithms over the object reference graph.
//!
//! Every algorithm here is generic over the traits in [`crate::graph`], runs on an
//! explicit work queue or frame stack rather than call-stack recursion, and polls a
//! [`CancellationToken`](crate::utils::CancellationToken) once per step.
//!
//! # Available Algorithms
//!
//! ## Reachability
//!
//! - [`reachable_from`] - Capped breadth-first reachability with an optional excluded node
//!
//! ## Root Paths
//!
//! - [`path_to_root`] - Shortest chain of referrers from an object back to a root
//! - [`paths_from_roots`] - Several distinct root-to-object chains
//!
//! ## Cycle Detection
//!
//! - [`find_cycles`] - Bounded three-colour cycle enumeration
//!
//! # Algorithm Selection
//!
//! | Algorithm | Time Complexity | Use Case |
//! |-----------|-----------------|----------|
//! | Reachability | O(min(V + E, cap)) | Retained-size estimation |
//! | Root path | O(V + E) | "Why is this object alive?" |
//! | Paths from roots | bounded by `max_paths` and a node cap | Multiple retainers |
//! | Cycles | O(V + E) | Cyclic retention |

mod cycles;
mod paths;
mod traversal;

pub use cycles::{find_cycles, Cycle};
pub use paths::{path_to_root, paths_from_roots, RootPaths, RootSearch};
pub use traversal::{reachable_from, Reachability};
