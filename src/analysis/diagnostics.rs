//! Structured diagnostic findings attached to an analysis result.

use serde::Serialize;
use strum::{AsRefStr, Display, EnumCount, EnumIter};

/// Severity of a diagnostic, ordered from least to most severe.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    AsRefStr,
    EnumIter,
    EnumCount,
    Serialize,
)]
pub enum Severity {
    /// Informational only
    Info,
    /// Worth investigating
    Warning,
    /// Likely defect
    Error,
    /// Immediate action required
    Critical,
}

/// GC pressure caused by pinned objects.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumIter, Serialize,
)]
pub enum PressureLevel {
    /// Pinned roots above the configured threshold
    High,
    /// Pinned roots above the extreme threshold
    Extreme,
}

/// Discriminant of [`Diagnostic`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, EnumCount, Serialize,
)]
pub enum DiagnosticKind {
    /// See [`Diagnostic::Heap`]
    Heap,
    /// See [`Diagnostic::Deadlock`]
    Deadlock,
    /// See [`Diagnostic::PinnedObjects`]
    PinnedObjects,
    /// See [`Diagnostic::AsyncCorruption`]
    AsyncCorruption,
}

/// A structured finding.
///
/// The classifier itself produces [`Diagnostic::Heap`] and [`Diagnostic::PinnedObjects`];
/// the remaining variants are produced by callers that inspect threads and async state
/// and want to attach their findings to the same result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    /// Large free blocks fragmenting the heap.
    Heap {
        /// Free bytes in large blocks divided by heap size, in `[0, 1]`
        fragmentation_level: f64,
        /// Size of the largest free block in bytes
        largest_free_block: u64,
        /// Heap size in bytes
        total_size: u64,
    },
    /// Threads waiting on each other's locks.
    Deadlock {
        /// Managed thread ids involved
        thread_ids: Vec<u32>,
        /// Descriptions of the contested lock objects
        lock_objects: Vec<String>,
    },
    /// Many pinned roots preventing heap compaction.
    PinnedObjects {
        /// Number of pinned root entries
        count: usize,
        /// Resulting GC pressure
        pressure: PressureLevel,
    },
    /// An async state machine in an inconsistent state.
    AsyncCorruption {
        /// Identifier of the state machine
        state_machine_id: String,
        /// Stack trace at which the corruption was observed
        stack_trace: String,
    },
}

impl Diagnostic {
    /// Returns the variant discriminant.
    #[must_use]
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Diagnostic::Heap { .. } => DiagnosticKind::Heap,
            Diagnostic::Deadlock { .. } => DiagnosticKind::Deadlock,
            Diagnostic::PinnedObjects { .. } => DiagnosticKind::PinnedObjects,
            Diagnostic::AsyncCorruption { .. } => DiagnosticKind::AsyncCorruption,
        }
    }

    /// Returns a one-line human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Diagnostic::Heap {
                fragmentation_level,
                ..
            } => format!("Heap fragmentation: {:.2}%", fragmentation_level * 100.0),
            Diagnostic::Deadlock { thread_ids, .. } => {
                let threads: Vec<String> = thread_ids.iter().map(u32::to_string).collect();
                format!("Deadlock detected between threads {}", threads.join(", "))
            }
            Diagnostic::PinnedObjects { count, pressure } => {
                format!("Found {count} pinned objects causing {pressure} GC pressure")
            }
            Diagnostic::AsyncCorruption {
                state_machine_id, ..
            } => format!("Async state machine {state_machine_id} shows signs of corruption"),
        }
    }

    /// Returns the severity of the finding.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::Heap { .. } => Severity::Warning,
            Diagnostic::Deadlock { .. } => Severity::Critical,
            Diagnostic::PinnedObjects {
                pressure: PressureLevel::Extreme,
                ..
            } => Severity::Error,
            Diagnostic::PinnedObjects { .. } => Severity::Warning,
            Diagnostic::AsyncCorruption { .. } => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions() {
        let heap = Diagnostic::Heap {
            fragmentation_level: 0.65,
            largest_free_block: 8 << 20,
            total_size: 512 << 20,
        };
        assert_eq!(heap.kind(), DiagnosticKind::Heap);
        assert_eq!(heap.description(), "Heap fragmentation: 65.00%");

        let deadlock = Diagnostic::Deadlock {
            thread_ids: vec![4, 9],
            lock_objects: vec!["App.Sync".into()],
        };
        assert_eq!(
            deadlock.description(),
            "Deadlock detected between threads 4, 9"
        );
        assert_eq!(deadlock.severity(), Severity::Critical);

        let pinned = Diagnostic::PinnedObjects {
            count: 120,
            pressure: PressureLevel::High,
        };
        assert_eq!(
            pinned.description(),
            "Found 120 pinned objects causing High GC pressure"
        );
    }

    #[test]
    fn test_severity_ordering() {
        let extreme = Diagnostic::PinnedObjects {
            count: 900,
            pressure: PressureLevel::Extreme,
        };
        let high = Diagnostic::PinnedObjects {
            count: 60,
            pressure: PressureLevel::High,
        };
        assert!(extreme.severity() > high.severity());
        assert!(Severity::Info < Severity::Critical);
    }
}
