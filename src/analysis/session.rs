//! Analysis session: the owner of a snapshot and everything derived from it.
//!
//! An [`AnalysisSession`] takes the snapshot by value, so nothing else can touch the heap
//! while queries run. Derived state is computed on first use and kept for the session:
//!
//! ```text
//! snapshot ─► census ─────────────────────────────┐
//!     └────► root table ─► graph index ─► paths ──┼─► classifier ─► AnalysisResult
//!                               ├───────► cycles  │
//!                               └───────► retained sizes
//! ```
//!
//! Dropping the session drops the census, the index and, unless it was shared through
//! [`AnalysisSession::with_memo`], the retention memo.

use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::{
    analysis::{
        AnalysisOptions, AnalysisResult, HeapCensus, HeapEvidence, LeakClassifier, RetainedSize,
        RetainedSizeEstimator, RetentionMemo, RetentionPath, RetentionPathFinder, RetentionPaths,
        RootTable, TypeCensusBuilder,
    },
    graph::{
        algorithms::{find_cycles, Cycle},
        ObjectGraphIndex,
    },
    snapshot::{Address, FreeBlock, HeapSnapshotProvider},
    utils::CancellationToken,
    Error, Result,
};

/// Details of a single live object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Address of the object
    pub address: Address,
    /// Type name, or `Unknown`
    pub type_name: String,
    /// Shallow size in bytes
    pub size: u64,
    /// GC generation, when the provider can tell
    pub generation: Option<u32>,
}

/// Owns a frozen snapshot and answers analysis queries over it.
///
/// # Examples
///
/// ```rust
/// use heapscope::{
///     analysis::{AnalysisOptions, AnalysisSession},
///     snapshot::{Address, MemorySnapshotBuilder, RootKind},
/// };
///
/// let (root, node) = (Address::new(0x100), Address::new(0x200));
/// let snapshot = MemorySnapshotBuilder::new()
///     .object(root, "App.Program", 32)
///     .object(node, "App.Node", 64)
///     .reference(root, node)
///     .root(root, RootKind::Stack)
///     .build();
///
/// let session = AnalysisSession::new(snapshot, AnalysisOptions::default())?;
/// let path = session.retention_path(node)?.expect("rooted");
/// assert_eq!(path.root_step(), Some("GC ROOT → Stack (0x100)"));
///
/// let result = session.execute_or_degrade();
/// assert!(result.confidence <= 1.0);
/// # Ok::<(), heapscope::Error>(())
/// ```
pub struct AnalysisSession<P> {
    snapshot: P,
    options: AnalysisOptions,
    cancel: CancellationToken,
    memo: Arc<RetentionMemo>,
    census: OnceLock<HeapCensus>,
    roots: OnceLock<RootTable>,
    index: OnceLock<ObjectGraphIndex>,
}

impl<P: HeapSnapshotProvider> AnalysisSession<P> {
    /// Starts a session over `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SnapshotNotReady`] if the heap cannot be walked.
    pub fn new(snapshot: P, options: AnalysisOptions) -> Result<Self> {
        if !snapshot.can_walk() {
            return Err(not_ready_error!("cannot walk the managed heap"));
        }

        Ok(AnalysisSession {
            snapshot,
            options,
            cancel: CancellationToken::new(),
            memo: RetentionMemo::shared(),
            census: OnceLock::new(),
            roots: OnceLock::new(),
            index: OnceLock::new(),
        })
    }

    /// Uses `memo` instead of a private retention memo.
    ///
    /// Only share a memo between sessions over the same snapshot with equal
    /// [`AnalysisLimits`](crate::analysis::AnalysisLimits). Entries are keyed by address
    /// alone, so a path cached under one depth bound or index cap is returned unchanged
    /// to sessions configured differently.
    #[must_use]
    pub fn with_memo(mut self, memo: Arc<RetentionMemo>) -> Self {
        self.memo = memo;
        self
    }

    /// Uses `token` for cooperative cancellation of every query.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the session's cancellation token.
    ///
    /// Clone it to cancel running queries from another thread.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the retention memo.
    #[must_use]
    pub fn memo(&self) -> &Arc<RetentionMemo> {
        &self.memo
    }

    /// Returns the options the session was created with.
    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Returns the snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &P {
        &self.snapshot
    }

    /// Returns the type census, computing it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled during the first computation.
    pub fn census(&self) -> Result<&HeapCensus> {
        if let Some(census) = self.census.get() {
            return Ok(census);
        }

        let census =
            TypeCensusBuilder::from_options(&self.options).build(&self.snapshot, &self.cancel)?;
        Ok(self.census.get_or_init(|| census))
    }

    /// Returns the GC root table, enumerating roots on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled during the first enumeration.
    pub fn root_table(&self) -> Result<&RootTable> {
        if let Some(roots) = self.roots.get() {
            return Ok(roots);
        }

        let roots = RootTable::collect(&self.snapshot, &self.cancel)?;
        Ok(self.roots.get_or_init(|| roots))
    }

    /// Returns the graph index over everything reachable from the GC roots, building it
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled during construction.
    pub fn graph_index(&self) -> Result<&ObjectGraphIndex> {
        if let Some(index) = self.index.get() {
            return Ok(index);
        }

        let roots = self.root_table()?;
        let index = ObjectGraphIndex::build_bounded(
            &self.snapshot,
            roots.addresses(),
            self.options.limits.max_index_nodes,
            &self.cancel,
        )?;
        if index.is_truncated() {
            log::warn!(
                "Graph index stopped at {} objects; paths and retained sizes are approximate",
                index.object_count()
            );
        }
        Ok(self.index.get_or_init(|| index))
    }

    /// Returns `true` if the graph index stopped at `limits.max_index_nodes`.
    ///
    /// Retained sizes computed by such a session are flagged approximate, and retention
    /// paths of objects outside the index are searched on the snapshot directly.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled while building the index.
    pub fn is_approximate(&self) -> Result<bool> {
        Ok(self.graph_index()?.is_truncated())
    }

    /// Returns the memoized shortest retention path of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled, or
    /// [`crate::Error::ResourceCapExceeded`] if the index is truncated and the search
    /// over the snapshot visited `limits.max_traversal_nodes` objects without an answer.
    pub fn retention_path(&self, address: Address) -> Result<Option<RetentionPath>> {
        if let Some(cached) = self.memo.get(address) {
            return Ok(cached);
        }
        self.path_finder()?.find(address, &self.cancel)
    }

    /// Returns up to `limits.max_paths` distinct retention paths of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled.
    pub fn find_paths_to(&self, address: Address) -> Result<RetentionPaths> {
        self.path_finder()?
            .find_all(address, self.options.limits.max_paths, &self.cancel)
    }

    /// Returns up to `limits.max_cycles` reference cycles among reachable objects.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled.
    pub fn cycles(&self) -> Result<Vec<Cycle>> {
        let index = self.graph_index()?;
        find_cycles(index, self.options.limits.max_cycles, &self.cancel)
    }

    /// Estimates retained sizes of the top census types' samples, largest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled.
    pub fn retained_sizes(&self) -> Result<Vec<RetainedSize>> {
        let census = self.census()?;
        let index = self.graph_index()?;
        let estimator =
            RetainedSizeEstimator::new(&self.snapshot, index, self.options.limits.max_traversal_nodes);
        let candidates =
            estimator.candidates(census, self.options.approx_retained_size_candidate_count);
        estimator.estimate_all(candidates, &self.cancel)
    }

    /// Resolves a single object, including its generation when available.
    #[must_use]
    pub fn object_info(&self, address: Address) -> Option<ObjectInfo> {
        let object = self.snapshot.get_object(address)?;
        let generation = object
            .generation
            .or_else(|| self.snapshot.try_get_generation(address));
        Some(ObjectInfo {
            address,
            type_name: object.type_name_or_unknown().to_string(),
            size: object.size,
            generation,
        })
    }

    /// Returns `true` if `address` resolves to a live object of a known type.
    #[must_use]
    pub fn is_object_alive(&self, address: Address) -> bool {
        self.snapshot
            .get_object(address)
            .is_some_and(|object| object.type_name.is_some())
    }

    /// Runs the full analysis: census, classification, diagnostics and, when enabled,
    /// retained sizes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cancelled`] if cancelled. Use
    /// [`execute_or_degrade`](Self::execute_or_degrade) to always get a result.
    pub fn execute(&self) -> Result<AnalysisResult> {
        let census = self.census()?;
        let roots = self.root_table()?;

        let mut free_blocks: Vec<FreeBlock> = Vec::new();
        for block in self.snapshot.enumerate_free_blocks() {
            self.cancel.check()?;
            free_blocks.push(block);
        }

        let classifier = LeakClassifier::new(
            self.options.thresholds.clone(),
            self.options.limits.classifier_type_window,
        );
        let evidence = HeapEvidence {
            pinned_roots: roots.pinned_count(),
            free_blocks: &free_blocks,
        };
        let mut result = classifier.classify(census, evidence, |sample| {
            match self.retention_path(sample) {
                Err(Error::ResourceCapExceeded { what, limit }) => {
                    log::warn!("Retention path of {sample} unknown ({what} limit {limit})");
                    Ok(None)
                }
                other => other,
            }
        })?;

        if self.options.calculate_approx_retained_size {
            result.retained_sizes = self.retained_sizes()?;
        }

        log::info!(
            "Analysis complete: {} (confidence {:.2}, {} diagnostics)",
            result.pattern.as_ref().map_or("no pattern", AsRef::as_ref),
            result.confidence,
            result.diagnostics.len()
        );
        Ok(result)
    }

    /// Runs [`execute`](Self::execute), turning any failure into a zero-confidence
    /// result that explains what went wrong.
    #[must_use]
    pub fn execute_or_degrade(&self) -> AnalysisResult {
        match self.execute() {
            Ok(result) => result,
            Err(error) => {
                log::warn!("Analysis degraded: {error}");
                AnalysisResult::degraded(&error)
            }
        }
    }

    fn path_finder(&self) -> Result<RetentionPathFinder<'_, P>> {
        Ok(RetentionPathFinder::new(
            &self.snapshot,
            self.graph_index()?,
            self.root_table()?,
            &self.memo,
            self.options.limits.max_path_depth,
            self.options.limits.max_traversal_nodes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::LeakPattern,
        analysis::AnalysisLimits,
        snapshot::{MemorySnapshot, MemorySnapshotBuilder, RootKind},
        test::{addr, chain_snapshot, end_to_end_snapshot, static_cache_snapshot, CountingSnapshot},
    };

    fn session(snapshot: MemorySnapshot) -> AnalysisSession<MemorySnapshot> {
        AnalysisSession::new(snapshot, AnalysisOptions::default()).unwrap()
    }

    #[test]
    fn test_not_walkable_snapshot_is_rejected() {
        let snapshot = MemorySnapshotBuilder::new().not_walkable().build();
        assert!(matches!(
            AnalysisSession::new(snapshot, AnalysisOptions::default()),
            Err(Error::SnapshotNotReady(_))
        ));
    }

    #[test]
    fn test_end_to_end() {
        let session = session(end_to_end_snapshot());

        let o1 = session.retention_path(addr(0x200)).unwrap().unwrap();
        assert_eq!(o1.root_address(), Some(addr(0x100)));
        assert!(session.retention_path(addr(0x400)).unwrap().is_none());

        let cycles = session.cycles().unwrap();
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].contains(addr(0x200)) && cycles[0].contains(addr(0x300)));

        let retained = session.retained_sizes().unwrap();
        assert!(retained.iter().all(|size| size.address != addr(0x400)));
        assert_eq!(retained[0].address, addr(0x100));
    }

    #[test]
    fn test_derived_state_is_computed_once() {
        let session = AnalysisSession::new(
            CountingSnapshot::new(end_to_end_snapshot()),
            AnalysisOptions::default(),
        )
        .unwrap();

        let first = session.graph_index().unwrap() as *const ObjectGraphIndex;
        let second = session.graph_index().unwrap() as *const ObjectGraphIndex;
        assert_eq!(first, second);
        assert_eq!(session.snapshot().root_enumerations(), 1);

        let enumerations = session.snapshot().reference_enumerations();
        session.cycles().unwrap();
        session.retained_sizes().unwrap();
        assert_eq!(session.snapshot().reference_enumerations(), enumerations);
    }

    #[test]
    fn test_execute_static_leak() {
        let session = session(static_cache_snapshot("App.Entry", 500, 64));
        let result = session.execute().unwrap();

        assert_eq!(result.pattern, Some(LeakPattern::StaticReference));
        assert!(result.confidence >= 0.95);
        assert!(!result.retained_sizes.is_empty());
        assert!(session.memo().contains(addr(0x1_0000)));
    }

    #[test]
    fn test_execute_without_retained_sizes() {
        let session = AnalysisSession::new(
            end_to_end_snapshot(),
            AnalysisOptions::default().with_retained_size(false),
        )
        .unwrap();
        let result = session.execute().unwrap();

        assert!(result.retained_sizes.is_empty());
        assert_eq!(result.pattern, None);
    }

    #[test]
    fn test_cancelled_execution_degrades() {
        let session = session(end_to_end_snapshot());
        session.cancellation_token().cancel();

        assert!(matches!(session.execute(), Err(Error::Cancelled)));
        let result = session.execute_or_degrade();
        assert_eq!(result.confidence, 0.0);
        assert!(result.root_cause.contains("cancelled"));
    }

    #[test]
    fn test_object_info() {
        let snapshot = MemorySnapshotBuilder::new()
            .object(addr(0x10), "App.Young", 24)
            .generation(addr(0x10), 0)
            .untyped_object(addr(0x20), 8)
            .root(addr(0x10), RootKind::Stack)
            .build();
        let session = session(snapshot);

        let info = session.object_info(addr(0x10)).unwrap();
        assert_eq!(info.type_name, "App.Young");
        assert_eq!(info.generation, Some(0));
        assert_eq!(session.object_info(addr(0x20)).unwrap().generation, None);
        assert!(session.object_info(addr(0x30)).is_none());

        assert!(session.is_object_alive(addr(0x10)));
        assert!(!session.is_object_alive(addr(0x20)));
        assert!(!session.is_object_alive(addr(0x30)));
    }

    #[test]
    fn test_shared_memo() {
        let memo = RetentionMemo::shared();
        let first = session(end_to_end_snapshot()).with_memo(Arc::clone(&memo));
        first.retention_path(addr(0x300)).unwrap();
        drop(first);

        let second = AnalysisSession::new(
            CountingSnapshot::new(end_to_end_snapshot()),
            AnalysisOptions::default(),
        )
        .unwrap()
        .with_memo(memo);
        assert!(second.retention_path(addr(0x300)).unwrap().is_some());
        assert_eq!(second.snapshot().get_object_calls(), 0);
    }

    fn capped_session(index_nodes: usize, traversal_nodes: usize) -> AnalysisSession<MemorySnapshot> {
        let limits = AnalysisLimits::default()
            .with_max_index_nodes(index_nodes)
            .with_max_traversal_nodes(traversal_nodes);
        AnalysisSession::new(chain_snapshot(10, 16), AnalysisOptions::default().with_limits(limits))
            .unwrap()
    }

    #[test]
    fn test_capped_index_keeps_paths_and_flags_sizes() {
        let session = capped_session(3, 10_000);
        assert!(session.is_approximate().unwrap());

        let path = session.retention_path(addr(8)).unwrap().unwrap();
        assert_eq!(path.depth(), 7);
        assert_eq!(path.root_address(), Some(addr(1)));

        let retained = session.retained_sizes().unwrap();
        assert!(!retained.is_empty());
        assert!(retained.iter().all(|size| size.approximate));

        let paths = session.find_paths_to(addr(2)).unwrap();
        assert!(paths.truncated);
        assert_eq!(paths.paths.len(), 1);
    }

    #[test]
    fn test_capped_search_is_an_error_not_a_missing_path() {
        let session = capped_session(3, 4);

        assert!(matches!(
            session.retention_path(addr(8)),
            Err(Error::ResourceCapExceeded { .. })
        ));
        assert!(!session.memo().contains(addr(8)));
        assert!(session.retention_path(addr(2)).unwrap().is_some());

        let result = session.execute().unwrap();
        assert!(result.retained_sizes.iter().all(|size| size.approximate));
    }

    #[test]
    fn test_uncapped_session_is_exact() {
        let session = session(chain_snapshot(10, 16));
        assert!(!session.is_approximate().unwrap());

        let retained = session.retained_sizes().unwrap();
        let head = retained.iter().find(|size| size.address == addr(1)).unwrap();
        assert_eq!(head.bytes, 160);
        assert!(!head.approximate);
    }

    #[test]
    fn test_find_paths_to_uses_path_limit() {
        let mut builder = MemorySnapshotBuilder::new().object(addr(0x50), "App.Shared", 8);
        for root in 1..=4u64 {
            builder = builder
                .object(addr(root), "App.Owner", 8)
                .reference(addr(root), addr(0x50))
                .root(addr(root), RootKind::Stack);
        }
        let snapshot = builder.build();

        let all = session(snapshot.clone()).find_paths_to(addr(0x50)).unwrap();
        assert_eq!(all.paths.len(), 4);

        let limited = AnalysisSession::new(
            snapshot,
            AnalysisOptions::default().with_limits(AnalysisLimits::default().with_max_paths(2)),
        )
        .unwrap()
        .find_paths_to(addr(0x50))
        .unwrap();
        assert_eq!(limited.paths.len(), 2);
        assert!(!limited.truncated);
    }
}
