//! Reference cycle detection.
//!
//! Reference cycles do not leak under a tracing GC on their own, but a cycle that is
//! reachable from a root keeps every member alive as long as any one member is
//! referenced. Reporting them helps explain retention that no single reference
//! accounts for.
//!
//! The search is an iterative three-colour depth-first search with an explicit frame
//! stack, so adversarially deep object chains cannot overflow the call stack.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{graph::Successors, snapshot::Address, utils::CancellationToken, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White, // Unvisited
    Gray,  // On the current DFS path
    Black, // Completely processed
}

/// A reference cycle.
///
/// Holds at least two addresses; each element references the next, and the last
/// element references the first.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Cycle(Vec<Address>);

impl Cycle {
    /// Returns the addresses of the cycle in reference order.
    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.0
    }

    /// Returns the number of objects in the cycle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; cycles have at least two members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `address` is a member of the cycle.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.0.contains(&address)
    }

    /// Returns the members rotated so the lowest address comes first.
    fn canonical(&self) -> Vec<Address> {
        let pivot = self
            .0
            .iter()
            .enumerate()
            .min_by_key(|(_, addr)| **addr)
            .map_or(0, |(idx, _)| idx);
        let mut rotated = self.0[pivot..].to_vec();
        rotated.extend_from_slice(&self.0[..pivot]);
        rotated
    }
}

struct Frame {
    node: Address,
    children: Vec<Address>,
    next: usize,
}

/// Finds up to `max_cycles` distinct reference cycles.
///
/// Start nodes are taken from [`GraphBase::node_ids`](crate::graph::GraphBase::node_ids),
/// so the result is deterministic whenever the graph iterates its nodes in a fixed
/// order (as [`crate::graph::ObjectGraphIndex`] does). Each back edge to a node on the
/// current path yields the path suffix starting at that node.
///
/// Single-object self references are not reported, since they cannot keep anything
/// alive that the object itself does not already retain. Rotations of an already
/// reported cycle are skipped.
///
/// # Errors
///
/// Returns [`crate::Error::Cancelled`] if `cancel` fires; cycles found so far are
/// discarded.
pub fn find_cycles<G: Successors>(
    graph: &G,
    max_cycles: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Cycle>> {
    let mut cycles = Vec::new();
    if max_cycles == 0 {
        return Ok(cycles);
    }

    let mut colors: HashMap<Address, Color> = HashMap::new();
    let mut reported: HashSet<Vec<Address>> = HashSet::new();

    for start in graph.node_ids() {
        if colors.get(&start).copied().unwrap_or(Color::White) != Color::White {
            continue;
        }

        let mut path: Vec<Address> = vec![start];
        let mut on_path: HashMap<Address, usize> = HashMap::from([(start, 0)]);
        let mut stack = vec![Frame {
            node: start,
            children: graph.successors(start).collect(),
            next: 0,
        }];
        colors.insert(start, Color::Gray);

        while let Some(frame) = stack.last_mut() {
            cancel.check()?;

            if frame.next >= frame.children.len() {
                colors.insert(frame.node, Color::Black);
                on_path.remove(&frame.node);
                path.pop();
                stack.pop();
                continue;
            }

            let child = frame.children[frame.next];
            frame.next += 1;

            match colors.get(&child).copied().unwrap_or(Color::White) {
                Color::White => {
                    colors.insert(child, Color::Gray);
                    on_path.insert(child, path.len());
                    path.push(child);
                    stack.push(Frame {
                        node: child,
                        children: graph.successors(child).collect(),
                        next: 0,
                    });
                }
                Color::Gray => {
                    let Some(&begin) = on_path.get(&child) else {
                        continue;
                    };
                    let cycle = Cycle(path[begin..].to_vec());
                    if cycle.len() < 2 || !reported.insert(cycle.canonical()) {
                        continue;
                    }

                    cycles.push(cycle);
                    if cycles.len() >= max_cycles {
                        log::debug!("Found {} cycles (limit reached)", cycles.len());
                        return Ok(cycles);
                    }
                }
                Color::Black => {}
            }
        }
    }

    log::debug!("Found {} cycles", cycles.len());
    Ok(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::ObjectGraphIndex,
        snapshot::{MemorySnapshotBuilder, RootKind},
        test::{addr, end_to_end_snapshot},
        Error,
    };

    fn index_of(edges: &[(u64, u64)], root: u64) -> ObjectGraphIndex {
        let mut builder = MemorySnapshotBuilder::new();
        for &(from, to) in edges {
            builder = builder
                .object(addr(from), "Node", 8)
                .object(addr(to), "Node", 8);
        }
        for &(from, to) in edges {
            builder = builder.reference(addr(from), addr(to));
        }
        let snapshot = builder.root(addr(root), RootKind::Stack).build();
        ObjectGraphIndex::build(&snapshot, [addr(root)], &CancellationToken::new()).unwrap()
    }

    fn assert_valid(graph: &ObjectGraphIndex, cycle: &Cycle) {
        assert!(cycle.len() >= 2);
        let nodes = cycle.addresses();
        for pair in nodes.windows(2) {
            assert!(
                graph.forward_references_of(pair[0]).contains(&pair[1]),
                "no edge from {} to {}",
                pair[0],
                pair[1]
            );
        }
        let (last, first) = (nodes[nodes.len() - 1], nodes[0]);
        assert!(graph.forward_references_of(last).contains(&first));
    }

    #[test]
    fn test_end_to_end_single_cycle() {
        let snapshot = end_to_end_snapshot();
        let index =
            ObjectGraphIndex::build(&snapshot, [addr(0x100)], &CancellationToken::new()).unwrap();

        let cycles = find_cycles(&index, 5, &CancellationToken::new()).unwrap();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].addresses(), &[addr(0x200), addr(0x300)]);
        assert_valid(&index, &cycles[0]);
    }

    #[test]
    fn test_acyclic_diamond() {
        let index = index_of(&[(1, 2), (1, 3), (2, 4), (3, 4)], 1);
        assert!(find_cycles(&index, 5, &CancellationToken::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_self_loop_not_reported() {
        let index = index_of(&[(1, 1), (1, 2)], 1);
        assert!(find_cycles(&index, 5, &CancellationToken::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_multiple_cycles_are_valid() {
        // 1 -> 2 -> 3 -> 1, 3 -> 4 -> 5 -> 3, 5 -> 6 -> 5
        let index = index_of(
            &[(1, 2), (2, 3), (3, 1), (3, 4), (4, 5), (5, 3), (5, 6), (6, 5)],
            1,
        );

        let cycles = find_cycles(&index, 10, &CancellationToken::new()).unwrap();

        assert_eq!(cycles.len(), 3);
        for cycle in &cycles {
            assert_valid(&index, cycle);
        }
    }

    #[test]
    fn test_max_cycles_respected() {
        let index = index_of(
            &[(1, 2), (2, 1), (1, 3), (3, 1), (1, 4), (4, 1)],
            1,
        );

        let cycles = find_cycles(&index, 2, &CancellationToken::new()).unwrap();
        assert_eq!(cycles.len(), 2);
        assert!(find_cycles(&index, 0, &CancellationToken::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let depth = 200_000u64;
        let mut builder = MemorySnapshotBuilder::new();
        for i in 1..=depth {
            builder = builder.object(addr(i), "Link", 8);
        }
        for i in 1..depth {
            builder = builder.reference(addr(i), addr(i + 1));
        }
        let snapshot = builder
            .reference(addr(depth), addr(1))
            .root(addr(1), RootKind::Stack)
            .build();
        let index =
            ObjectGraphIndex::build(&snapshot, [addr(1)], &CancellationToken::new()).unwrap();

        let cycles = find_cycles(&index, 1, &CancellationToken::new()).unwrap();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), depth as usize);
    }

    #[test]
    fn test_cancelled_search() {
        let index = index_of(&[(1, 2), (2, 1)], 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            find_cycles(&index, 5, &cancel),
            Err(Error::Cancelled)
        ));
    }
}
