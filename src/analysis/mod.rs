//! Heap analysis engine.
//!
//! This module turns a frozen [`HeapSnapshotProvider`](crate::snapshot::HeapSnapshotProvider)
//! into an explanation of why memory is retained.
//!
//! # Architecture
//!
//! Data flows one way:
//!
//! - [`TypeCensusBuilder`] - One pass over all objects, aggregating per type
//! - [`RootTable`] + [`ObjectGraphIndex`](crate::graph::ObjectGraphIndex) - Roots and the
//!   reachable reference graph
//! - [`RetentionPathFinder`] - Memoized "why is this alive?" chains
//! - [`find_cycles`](crate::graph::algorithms::find_cycles) - Reference cycles
//! - [`RetainedSizeEstimator`] - Approximate exclusive size of top candidates
//! - [`LeakClassifier`] - Ordered heuristic rules producing an [`AnalysisResult`]
//!
//! [`AnalysisSession`] owns the snapshot, caches the derived state and wires the stages
//! together; the components can also be used on their own.
//!
//! # Usage
//!
//! ```rust
//! use heapscope::{
//!     analysis::{AnalysisOptions, AnalysisSession},
//!     snapshot::{Address, MemorySnapshotBuilder, RootKind},
//! };
//!
//! let mut builder = MemorySnapshotBuilder::new()
//!     .object(Address::new(0x10), "App.Window", 64)
//!     .root(Address::new(0x10), RootKind::Stack);
//! for i in 0..100u64 {
//!     let closure = Address::new(0x1000 + i * 0x20);
//!     builder = builder
//!         .object(closure, "App.Window+<>c__DisplayClass3_0", 32)
//!         .reference(Address::new(0x10), closure);
//! }
//!
//! let session = AnalysisSession::new(builder.build(), AnalysisOptions::default())?;
//! let result = session.execute()?;
//! assert!(result.confidence > 0.9);
//! # Ok::<(), heapscope::Error>(())
//! ```

mod census;
mod classifier;
mod diagnostics;
mod options;
mod paths;
mod result;
mod retained;
mod roots;
mod session;

pub use census::{HeapCensus, TypeCensusBuilder, TypeSummary};
pub use classifier::{HeapEvidence, LeakClassifier, LeakPattern};
pub use diagnostics::{Diagnostic, DiagnosticKind, PressureLevel, Severity};
pub use options::{AnalysisLimits, AnalysisOptions, ClassifierThresholds};
pub use paths::{RetentionMemo, RetentionPath, RetentionPathFinder, RetentionPaths};
pub use result::AnalysisResult;
pub use retained::{RetainedSize, RetainedSizeEstimator};
pub use roots::RootTable;
pub use session::{AnalysisSession, ObjectInfo};
