//! # heapscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the heapscope library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all heapscope operations
pub use crate::Error;

/// The result type used throughout heapscope
pub use crate::Result;

/// Cooperative cancellation shared with long-running queries
pub use crate::utils::CancellationToken;

// ================================================================================================
// Snapshot Access
// ================================================================================================

/// Heap provider contract and its data types
pub use crate::snapshot::{
    Address, FreeBlock, HeapSnapshotProvider, ObjectRef, RootKind, RootRef,
};

/// Frozen in-memory snapshots
pub use crate::snapshot::{MemorySnapshot, MemorySnapshotBuilder};

// ================================================================================================
// Analysis
// ================================================================================================

/// Session entry point and configuration
pub use crate::analysis::{AnalysisLimits, AnalysisOptions, AnalysisSession, ClassifierThresholds};

/// Analysis outputs
pub use crate::analysis::{
    AnalysisResult, Diagnostic, HeapCensus, LeakPattern, RetainedSize, RetentionPath,
    TypeSummary,
};

/// Reference graph and cycles
pub use crate::graph::{algorithms::Cycle, ObjectGraphIndex};
