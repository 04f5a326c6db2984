//! Root path searches.
//!
//! Two complementary questions are answered here:
//!
//! - [`path_to_root`] walks *backward* from an object over the predecessor map until it
//!   reaches a GC root, producing the shortest chain of referrers ("why is this alive?").
//! - [`paths_from_roots`] walks *forward* from every root and collects several distinct
//!   root-to-object chains, which shows whether an object is retained through more than
//!   one route.
//!
//! Both searches are iterative and bounded by an explicit depth; the forward search is
//! also bounded by a node cap.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{
    graph::RootedGraph,
    snapshot::Address,
    utils::CancellationToken,
    Result,
};

/// Outcome of a [`path_to_root`] search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootSearch {
    /// Chain from the target (first) to a root (last), if one was found
    pub chain: Option<Vec<Address>>,
    /// `true` if some branch was cut off by the depth bound
    pub depth_limited: bool,
}

/// Finds the shortest chain of referrers from `target` back to a GC root.
///
/// Breadth-first over [`Predecessors`](crate::graph::Predecessors): the first root
/// reached is the closest one. `max_depth` bounds the number of reference hops; a
/// per-call visited set stops cycles from being walked twice.
///
/// A target that is itself a root yields a single-element chain.
///
/// # Errors
///
/// Returns [`crate::Error::Cancelled`] if `cancel` fires.
pub fn path_to_root<G: RootedGraph>(
    graph: &G,
    target: Address,
    max_depth: usize,
    cancel: &CancellationToken,
) -> Result<RootSearch> {
    let mut search = RootSearch::default();
    if graph.is_root(target) {
        search.chain = Some(vec![target]);
        return Ok(search);
    }

    // referrer -> the object it references, one hop closer to the target
    let mut toward_target: HashMap<Address, Address> = HashMap::new();
    let mut visited: HashSet<Address> = HashSet::from([target]);
    let mut queue: VecDeque<(Address, usize)> = VecDeque::from([(target, 0)]);

    while let Some((node, depth)) = queue.pop_front() {
        cancel.check()?;

        if depth >= max_depth {
            search.depth_limited = true;
            continue;
        }

        for referrer in graph.predecessors(node) {
            if !visited.insert(referrer) {
                continue;
            }
            toward_target.insert(referrer, node);

            if graph.is_root(referrer) {
                let mut chain = vec![referrer];
                let mut current = referrer;
                while let Some(&next) = toward_target.get(&current) {
                    chain.push(next);
                    current = next;
                }
                chain.reverse();
                search.chain = Some(chain);
                return Ok(search);
            }

            queue.push_back((referrer, depth + 1));
        }
    }

    Ok(search)
}

/// Outcome of a [`paths_from_roots`] search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RootPaths {
    /// Root-first chains ending at the target
    pub paths: Vec<Vec<Address>>,
    /// `true` if the search stopped at its node cap; more paths may exist
    pub truncated: bool,
}

struct Frame {
    node: Address,
    children: Vec<Address>,
    next: usize,
}

/// Collects the target and every node with a reference route to it.
///
/// Returns the set and whether the walk stopped at `max_nodes`.
fn ancestors_of<G: RootedGraph>(
    graph: &G,
    target: Address,
    max_nodes: usize,
    cancel: &CancellationToken,
) -> Result<(HashSet<Address>, bool)> {
    let mut ancestors: HashSet<Address> = HashSet::from([target]);
    let mut queue: VecDeque<Address> = VecDeque::from([target]);

    while let Some(node) = queue.pop_front() {
        cancel.check()?;

        for referrer in graph.predecessors(node) {
            if ancestors.contains(&referrer) {
                continue;
            }
            if ancestors.len() >= max_nodes {
                return Ok((ancestors, true));
            }
            ancestors.insert(referrer);
            queue.push_back(referrer);
        }
    }

    Ok((ancestors, false))
}

/// Collects up to `max_paths` distinct simple paths from the graph's roots to `target`.
///
/// Each path starts at a root and ends at `target`. The search is a depth-first walk
/// with an explicit stack; a node is never repeated within one path, and paths longer
/// than `max_depth` hops are not explored. Roots are tried in the graph's root order.
///
/// The walk only descends into nodes that can reach `target`, found by a backward
/// pass over the predecessors first. Both the backward pass and the number of
/// descents are capped at `max_nodes`; hitting either cap sets
/// [`RootPaths::truncated`].
///
/// # Errors
///
/// Returns [`crate::Error::Cancelled`] if `cancel` fires.
pub fn paths_from_roots<G: RootedGraph>(
    graph: &G,
    target: Address,
    max_paths: usize,
    max_depth: usize,
    max_nodes: usize,
    cancel: &CancellationToken,
) -> Result<RootPaths> {
    let mut result = RootPaths::default();
    if max_paths == 0 {
        return Ok(result);
    }

    let (ancestors, partial) = ancestors_of(graph, target, max_nodes, cancel)?;
    result.truncated = partial;
    let mut descents = 0usize;

    for root in graph.roots() {
        if root == target {
            result.paths.push(vec![root]);
            if result.paths.len() >= max_paths {
                return Ok(result);
            }
            continue;
        }
        if !ancestors.contains(&root) {
            continue;
        }

        let mut path = vec![root];
        let mut on_path: HashSet<Address> = HashSet::from([root]);
        let mut stack = vec![Frame {
            node: root,
            children: graph.successors(root).collect(),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            cancel.check()?;

            if frame.next >= frame.children.len() || path.len() > max_depth {
                on_path.remove(&frame.node);
                path.pop();
                stack.pop();
                continue;
            }

            let child = frame.children[frame.next];
            frame.next += 1;

            if on_path.contains(&child) || !ancestors.contains(&child) {
                continue;
            }
            if child == target {
                let mut found = path.clone();
                found.push(child);
                result.paths.push(found);
                if result.paths.len() >= max_paths {
                    return Ok(result);
                }
                continue;
            }

            if descents >= max_nodes {
                result.truncated = true;
                return Ok(result);
            }
            descents += 1;

            on_path.insert(child);
            path.push(child);
            stack.push(Frame {
                node: child,
                children: graph.successors(child).collect(),
                next: 0,
            });
        }
    }

    Ok(result)
}
