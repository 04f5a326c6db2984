// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # heapscope
//!
//! An analysis engine for frozen managed-heap snapshots. Given the objects, references
//! and GC roots of a heap, `heapscope` explains *why* memory is retained: which types
//! dominate the heap, what keeps a given object alive, which reference cycles exist,
//! roughly how much memory an object exclusively holds, and which well-known leak
//! pattern the heap most likely exhibits.
//!
//! ## Features
//!
//! - **📊 Type census** - Per-type instance counts, sizes and sample addresses in one pass
//! - **🔗 Reference index** - Forward and back reference maps of the reachable heap
//! - **🧭 Retention paths** - Shortest chain from a GC root to any object, memoized
//! - **🔁 Cycle detection** - Iterative, bounded, safe on adversarially deep graphs
//! - **📦 Retained size** - Two-pass approximation for the largest candidates
//! - **🩺 Leak classification** - Ordered heuristics with a confidence score and remediation
//!
//! Acquiring or parsing a heap dump is out of scope: the engine consumes any
//! [`snapshot::HeapSnapshotProvider`] implementation.
//!
//! ## Quick Start
//!
//! ```rust
//! use heapscope::prelude::*;
//!
//! let (program, cache) = (Address::new(0x100), Address::new(0x200));
//! let snapshot = MemorySnapshotBuilder::new()
//!     .object(program, "App.Program", 32)
//!     .object(cache, "App.Cache", 4096)
//!     .reference(program, cache)
//!     .root(program, RootKind::StaticVariable)
//!     .build();
//!
//! let session = AnalysisSession::new(snapshot, AnalysisOptions::default())?;
//! let path = session.retention_path(cache)?.expect("cache is rooted");
//! println!("{}", path.steps.join("\n"));
//!
//! let result = session.execute_or_degrade();
//! println!("{} ({:.0}%)", result.root_cause, result.confidence * 100.0);
//! # Ok::<(), heapscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`snapshot`] - The heap provider contract and an in-memory implementation
//! - [`graph`] - Reference index, graph traits and traversal algorithms
//! - [`analysis`] - Census, retention paths, retained size, classifier and session
//! - [`utils`] - Cancellation and formatting helpers
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Concurrency
//!
//! All traversals are single-threaded and synchronous over an immutable snapshot. Every
//! unbounded loop polls a [`utils::CancellationToken`] once per iteration. The retention
//! memo is a concurrent map and may be shared between sessions through an `Arc`.
//!
//! ## Error Handling
//!
//! Whole-operation failures ([`Error::SnapshotNotReady`], [`Error::Cancelled`]) are
//! returned to the caller. Per-object failures are recovered locally: unresolvable
//! objects are skipped, and traversals that hit their bounds produce results flagged as
//! approximate. A single retention-path query that cannot be answered within its
//! bounds fails with [`Error::ResourceCapExceeded`] without affecting other queries.
//! [`analysis::AnalysisSession::execute_or_degrade`] always yields a
//! displayable [`analysis::AnalysisResult`].
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use heapscope::prelude::*;
///
/// let snapshot = MemorySnapshotBuilder::new()
///     .object(Address::new(0x10), "App.Node", 16)
///     .build();
/// let session = AnalysisSession::new(snapshot, AnalysisOptions::quick())?;
/// assert_eq!(session.census()?.total_objects, 1);
/// # Ok::<(), heapscope::Error>(())
/// ```
pub mod prelude;

pub mod analysis;
pub mod graph;
pub mod snapshot;
pub mod utils;

/// `heapscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `heapscope` Error type
///
/// Whole-operation failures are fatal to the requested query; see the variant
/// documentation for which failures are recovered locally instead.
pub use error::Error;
