//! Bounded reachability traversal.
//!
//! Heaps can be arbitrarily large, so reachability queries take an explicit visited-node
//! cap. Hitting the cap is not an error: the result is returned with
//! [`Reachability::truncated`] set so callers can flag anything derived from it as
//! approximate.

use std::collections::{HashSet, VecDeque};

use crate::{graph::Successors, snapshot::Address, utils::CancellationToken, Result};

/// The set of nodes reached by [`reachable_from`].
#[derive(Clone, Debug, Default)]
pub struct Reachability {
    /// Every node visited, start nodes included
    pub visited: HashSet<Address>,
    /// `true` if the traversal stopped at its node cap with work remaining
    pub truncated: bool,
}

impl Reachability {
    /// Returns `true` if `node` was reached.
    #[must_use]
    pub fn contains(&self, node: Address) -> bool {
        self.visited.contains(&node)
    }

    /// Returns the number of reached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    /// Returns `true` if nothing was reached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}

/// Breadth-first reachability from a set of start nodes.
///
/// The `exclude` node is treated as removed from the graph: it is never visited and
/// edges into it are not followed. This is the primitive behind the "what stays alive
/// without this object?" half of retained-size estimation.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `starts` - Start nodes (null addresses are ignored)
/// * `exclude` - Optional node to treat as absent
/// * `max_nodes` - Visited-node cap
/// * `cancel` - Polled once per dequeued node
///
/// # Errors
///
/// Returns [`crate::Error::Cancelled`] if `cancel` fires.
///
/// # Examples
///
/// ```rust,ignore
/// let without = reachable_from(&index, index.roots(), Some(candidate), 10_000, &cancel)?;
/// let with = reachable_from(&index, [candidate], None, 10_000, &cancel)?;
/// ```
pub fn reachable_from<G, I>(
    graph: &G,
    starts: I,
    exclude: Option<Address>,
    max_nodes: usize,
    cancel: &CancellationToken,
) -> Result<Reachability>
where
    G: Successors,
    I: IntoIterator<Item = Address>,
{
    let mut result = Reachability::default();
    let mut queue: VecDeque<Address> = starts
        .into_iter()
        .filter(|node| !node.is_null() && Some(*node) != exclude)
        .collect();

    while let Some(node) = queue.pop_front() {
        cancel.check()?;

        if result.visited.contains(&node) {
            continue;
        }
        if result.visited.len() >= max_nodes {
            result.truncated = true;
            break;
        }
        result.visited.insert(node);

        for child in graph.successors(node) {
            if child.is_null() || Some(child) == exclude || result.visited.contains(&child) {
                continue;
            }
            queue.push_back(child);
        }
    }

    Ok(result)
}
