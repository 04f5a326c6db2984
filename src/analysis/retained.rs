//! Approximate retained size.
//!
//! The retained size of an object is the memory that would be freed if it were removed.
//! Computing it exactly needs a dominator tree over the whole heap; instead, for a small
//! candidate set, [`RetainedSizeEstimator`] runs two capped reachability passes:
//!
//! 1. `a`: everything reachable from the roots when the candidate is treated as absent
//! 2. `b`: everything reachable from the candidate
//!
//! and reports the total shallow size of `b \ a`.
//!
//! # Error Characteristics
//!
//! With uncapped traversals the result equals the dominated set of the candidate. With
//! the visited-node cap in place, an incomplete `a` overcounts (objects also reachable
//! elsewhere look exclusive) and an incomplete `b` undercounts; both cases set
//! [`RetainedSize::approximate`]. So does a truncated index, whose edges stop where its
//! construction stopped.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    analysis::HeapCensus,
    graph::{algorithms::reachable_from, ObjectGraphIndex, RootedGraph},
    snapshot::{Address, HeapSnapshotProvider, ObjectRef},
    utils::CancellationToken,
    Result,
};

/// Estimated retained size of one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetainedSize {
    /// The candidate object
    pub address: Address,
    /// Type of the candidate, or `Unknown`
    pub type_name: String,
    /// Total shallow size of the objects only reachable through the candidate
    pub bytes: u64,
    /// Number of objects only reachable through the candidate, itself included
    pub object_count: usize,
    /// `true` if a traversal hit its node cap or the index is truncated
    pub approximate: bool,
    /// Retained addresses that could not be resolved (counted with size zero)
    pub unresolved: usize,
}

/// Two-pass retained-size approximation over a graph index.
pub struct RetainedSizeEstimator<'a, P> {
    snapshot: &'a P,
    index: &'a ObjectGraphIndex,
    max_nodes: usize,
}

impl<'a, P: HeapSnapshotProvider> RetainedSizeEstimator<'a, P> {
    /// Creates an estimator whose traversals visit at most `max_nodes` objects each.
    pub fn new(snapshot: &'a P, index: &'a ObjectGraphIndex, max_nodes: usize) -> Self {
        RetainedSizeEstimator {
            snapshot,
            index,
            max_nodes,
        }
    }

    /// Selects candidates: the first indexed sample of each of the `count` largest
    /// census types.
    ///
    /// Objects outside the index are unreachable from every root and retain nothing,
    /// so they are never candidates.
    #[must_use]
    pub fn candidates(&self, census: &HeapCensus, count: usize) -> Vec<Address> {
        let mut seen = HashSet::new();
        census
            .by_size
            .iter()
            .take(count)
            .filter_map(|summary| {
                summary
                    .sample_addresses
                    .iter()
                    .copied()
                    .find(|address| self.index.contains(*address))
            })
            .filter(|address| seen.insert(*address))
            .collect()
    }

    /// Estimates the retained size of `candidate`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if `cancel` fires. Reaching the node cap is
    /// not an error; the result is flagged approximate instead.
    pub fn estimate(&self, candidate: Address, cancel: &CancellationToken) -> Result<RetainedSize> {
        let without = reachable_from(
            self.index,
            self.index.roots(),
            Some(candidate),
            self.max_nodes,
            cancel,
        )?;
        let through = reachable_from(self.index, [candidate], None, self.max_nodes, cancel)?;

        let mut result = RetainedSize {
            address: candidate,
            type_name: self
                .snapshot
                .get_object(candidate)
                .map(|obj| obj.type_name_or_unknown().to_string())
                .unwrap_or_else(|| ObjectRef::UNKNOWN_TYPE.to_string()),
            bytes: 0,
            object_count: 0,
            approximate: without.truncated || through.truncated || self.index.is_truncated(),
            unresolved: 0,
        };

        for &address in &through.visited {
            if without.contains(address) {
                continue;
            }
            cancel.check()?;

            result.object_count += 1;
            match self.snapshot.get_object(address) {
                Some(object) => result.bytes = result.bytes.saturating_add(object.size),
                None => result.unresolved += 1,
            }
        }

        if result.approximate {
            log::debug!(
                "Retained size of {candidate} is approximate (cap {} nodes{})",
                self.max_nodes,
                if self.index.is_truncated() { ", truncated index" } else { "" }
            );
        }

        Ok(result)
    }

    /// Estimates every candidate and sorts the results by retained bytes, largest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if `cancel` fires.
    pub fn estimate_all<I>(&self, candidates: I, cancel: &CancellationToken) -> Result<Vec<RetainedSize>>
    where
        I: IntoIterator<Item = Address>,
    {
        let mut results = candidates
            .into_iter()
            .map(|candidate| self.estimate(candidate, cancel))
            .collect::<Result<Vec<_>>>()?;
        results.sort_by(|a, b| b.bytes.cmp(&a.bytes).then(a.address.cmp(&b.address)));
        Ok(results)
    }
}
