//! Retention paths: why is an object alive?
//!
//! [`RetentionPathFinder`] answers the question by walking the back-reference map of an
//! [`ObjectGraphIndex`] from the object toward the GC roots, and renders the shortest
//! chain it finds as human-readable steps. Results, including "no path", are memoized
//! in a [`RetentionMemo`] so repeated queries never re-traverse.
//!
//! # Step Format
//!
//! Steps are ordered from the queried object to its root:
//!
//! ```text
//! App.Node → field (0x300)
//! App.Node → field (0x200)
//! GC ROOT → Stack (0x100)
//! ```
//!
//! The last step always names the root kind, so a classifier can look for markers such
//! as `Static` without re-resolving roots.
//!
//! # Truncated Indexes
//!
//! An index built with a node bound only holds back references of the objects it
//! visited. When such an index yields no chain, the finder searches forward from the
//! roots over the snapshot itself, visiting at most `max_nodes` objects. If that search
//! is cut off too, the query fails with [`crate::Error::ResourceCapExceeded`] instead
//! of reporting that no root holds the object.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
};

use dashmap::DashMap;
use serde::Serialize;

use crate::{
    analysis::RootTable,
    graph::{
        algorithms::{path_to_root, paths_from_roots},
        ObjectGraphIndex,
    },
    snapshot::{Address, HeapSnapshotProvider, ObjectRef, RootKind},
    utils::CancellationToken,
    Error, Result,
};

/// A rendered chain of references from an object to the GC root keeping it alive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetentionPath {
    /// The object the path was computed for
    pub object_address: Address,
    /// Addresses from the object (first) to the root (last)
    pub chain: Vec<Address>,
    /// Rendered steps, parallel to `chain`; the last step denotes the root
    pub steps: Vec<String>,
}

impl RetentionPath {
    /// Returns the address of the root holding the object.
    #[must_use]
    pub fn root_address(&self) -> Option<Address> {
        self.chain.last().copied()
    }

    /// Returns the rendered root step.
    #[must_use]
    pub fn root_step(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// Iterates the steps starting at the root.
    pub fn steps_from_root(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().rev().map(String::as_str)
    }

    /// Returns the number of reference hops between the object and its root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }

    /// Returns `true` if any step contains `marker`, ignoring ASCII case.
    #[must_use]
    pub fn mentions(&self, marker: &str) -> bool {
        let marker = marker.to_ascii_lowercase();
        self.steps
            .iter()
            .any(|step| step.to_ascii_lowercase().contains(&marker))
    }
}

/// Several retention paths of one object, see [`RetentionPathFinder::find_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RetentionPaths {
    /// Distinct paths, in root order
    pub paths: Vec<RetentionPath>,
    /// `true` if the search stopped at its node cap; more paths may exist
    pub truncated: bool,
}

/// Memo table of computed retention paths, keyed by object address.
///
/// A stored `None` records that no root was found within the depth bound; it is a
/// cached answer, distinct from an address that was never queried. The table is backed
/// by a concurrent map and can be shared between sessions over the same snapshot
/// through an [`Arc`]. Two sessions racing on the same address may both compute it;
/// the value is the same either way.
///
/// Entries are keyed by address alone. A path computed with one depth bound or root
/// set is returned as-is to every later query, so only share a memo between sessions
/// that use the same snapshot and the same [`AnalysisLimits`](crate::analysis::AnalysisLimits).
#[derive(Debug, Default)]
pub struct RetentionMemo {
    entries: DashMap<Address, Option<RetentionPath>>,
}

impl RetentionMemo {
    /// Creates an empty memo table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty memo table ready to be shared.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the cached result for `address`.
    ///
    /// The outer `Option` is `None` when the address was never computed.
    #[must_use]
    pub fn get(&self, address: Address) -> Option<Option<RetentionPath>> {
        self.entries.get(&address).map(|entry| entry.value().clone())
    }

    /// Stores a computed result.
    pub fn insert(&self, address: Address, path: Option<RetentionPath>) {
        self.entries.insert(address, path);
    }

    /// Returns `true` if a result for `address` is cached.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.entries.contains_key(&address)
    }

    /// Returns the number of cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached result.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Computes and memoizes retention paths over a graph index.
pub struct RetentionPathFinder<'a, P> {
    snapshot: &'a P,
    index: &'a ObjectGraphIndex,
    roots: &'a RootTable,
    memo: &'a RetentionMemo,
    max_depth: usize,
    max_nodes: usize,
}

impl<'a, P: HeapSnapshotProvider> RetentionPathFinder<'a, P> {
    /// Creates a finder.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Used to resolve type names for rendered steps
    /// * `index` - Back-reference map walked toward the roots
    /// * `roots` - Root kinds for the final step
    /// * `memo` - Cache consulted before and populated after each computation
    /// * `max_depth` - Maximum reference hops between object and root
    /// * `max_nodes` - Visited-node cap of multi-path and fallback searches
    pub fn new(
        snapshot: &'a P,
        index: &'a ObjectGraphIndex,
        roots: &'a RootTable,
        memo: &'a RetentionMemo,
        max_depth: usize,
        max_nodes: usize,
    ) -> Self {
        RetentionPathFinder {
            snapshot,
            index,
            roots,
            memo,
            max_depth,
            max_nodes,
        }
    }

    /// Returns the shortest retention path of `target`, or `None` if no root holds it
    /// within the depth bound.
    ///
    /// Unresolvable targets have no path. Cached results are returned without touching
    /// the snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if `cancel` fires, or
    /// [`crate::Error::ResourceCapExceeded`] if the index is truncated and the fallback
    /// search hit its node cap. Nothing is cached in either case.
    pub fn find(&self, target: Address, cancel: &CancellationToken) -> Result<Option<RetentionPath>> {
        if let Some(cached) = self.memo.get(target) {
            return Ok(cached);
        }

        let path = self.compute(target, cancel)?;
        self.memo.insert(target, path.clone());
        Ok(path)
    }

    /// Returns up to `max_paths` distinct retention paths of `target`.
    ///
    /// Unlike [`find`](Self::find) this explores routes through every root and is not
    /// memoized. The result is flagged truncated when the search hit its node cap or
    /// the index itself is truncated.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if `cancel` fires.
    pub fn find_all(
        &self,
        target: Address,
        max_paths: usize,
        cancel: &CancellationToken,
    ) -> Result<RetentionPaths> {
        let found = paths_from_roots(
            self.index,
            target,
            max_paths,
            self.max_depth,
            self.max_nodes,
            cancel,
        )?;
        Ok(RetentionPaths {
            paths: found
                .paths
                .into_iter()
                .map(|mut chain| {
                    chain.reverse();
                    self.render(target, chain)
                })
                .collect(),
            truncated: found.truncated || self.index.is_truncated(),
        })
    }

    fn compute(&self, target: Address, cancel: &CancellationToken) -> Result<Option<RetentionPath>> {
        if target.is_null() || self.snapshot.get_object(target).is_none() {
            log::trace!("No retention path for unresolvable object {target}");
            return Ok(None);
        }

        let search = path_to_root(self.index, target, self.max_depth, cancel)?;
        let chain = match search.chain {
            Some(chain) => Some(chain),
            None if self.index.is_truncated() => self.search_snapshot(target, cancel)?,
            None => {
                if search.depth_limited {
                    log::debug!(
                        "No root found for {target} within {} hops",
                        self.max_depth
                    );
                }
                None
            }
        };
        Ok(chain.map(|chain| self.render(target, chain)))
    }

    /// Breadth-first search from the roots over the snapshot's own references, for
    /// objects the truncated index never reached. Returns a target-first chain.
    fn search_snapshot(
        &self,
        target: Address,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Address>>> {
        log::debug!("Index is truncated, searching the snapshot for a root of {target}");

        // object -> the referrer it was discovered from, one hop closer to a root
        let mut toward_root: HashMap<Address, Address> = HashMap::new();
        let mut visited: HashSet<Address> = HashSet::new();
        let mut queue: VecDeque<(Address, usize)> = VecDeque::new();
        for root in self.index.root_set() {
            visited.insert(*root);
            queue.push_back((*root, 0));
        }

        let mut depth_limited = false;
        while let Some((node, depth)) = queue.pop_front() {
            cancel.check()?;

            if depth >= self.max_depth {
                depth_limited = true;
                continue;
            }

            for child in self.snapshot.enumerate_references(node) {
                if child.is_null() || !visited.insert(child) {
                    continue;
                }
                toward_root.insert(child, node);

                if child == target {
                    let mut chain = vec![child];
                    let mut current = child;
                    while let Some(&referrer) = toward_root.get(&current) {
                        chain.push(referrer);
                        current = referrer;
                    }
                    return Ok(Some(chain));
                }

                if visited.len() > self.max_nodes {
                    return Err(Error::ResourceCapExceeded {
                        what: "visited nodes",
                        limit: self.max_nodes,
                    });
                }
                queue.push_back((child, depth + 1));
            }
        }

        if depth_limited {
            log::debug!("No root found for {target} within {} hops", self.max_depth);
        }
        Ok(None)
    }

    /// Renders a target-first chain.
    fn render(&self, target: Address, chain: Vec<Address>) -> RetentionPath {
        let last = chain.len().saturating_sub(1);
        let steps = chain
            .iter()
            .enumerate()
            .map(|(position, &address)| {
                if position == last {
                    let kind = self.roots.kind_of(address).unwrap_or(RootKind::Other);
                    format!("GC ROOT → {kind} ({address})")
                } else {
                    let type_name = self
                        .snapshot
                        .get_object(address)
                        .map_or_else(|| ObjectRef::UNKNOWN_TYPE.to_string(), |obj| {
                            obj.type_name_or_unknown().to_string()
                        });
                    format!("{type_name} → field ({address})")
                }
            })
            .collect();

        RetentionPath {
            object_address: target,
            chain,
            steps,
        }
    }
}
