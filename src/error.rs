use thiserror::Error;

use crate::snapshot::Address;

/// Builds an [`Error::SnapshotNotReady`] with a formatted reason.
macro_rules! not_ready_error {
    ($msg:expr) => {
        crate::Error::SnapshotNotReady($msg.to_string())
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::SnapshotNotReady(format!($fmt, $($arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The taxonomy mirrors how failures are handled during an analysis session:
///
/// ## Whole-operation failures (propagated to the caller)
/// - [`Error::SnapshotNotReady`] - The heap cannot be walked, or the session has no snapshot
/// - [`Error::Cancelled`] - Cooperative cancellation was observed mid-traversal
///
/// ## Per-object and bound failures (recoverable)
/// - [`Error::InvalidObject`] - An address failed to resolve; traversals skip it and continue
/// - [`Error::ResourceCapExceeded`] - A traversal hit its node bound before it could
///   answer. Most results are flagged approximate instead; a retention path lookup
///   outside a truncated graph index returns this error, and only that query fails.
///
/// [`Error::InvalidObject`] exists for callers composing their own traversals on top of
/// the provider, and so that [`crate::analysis::AnalysisResult::degraded`] can describe it.
///
/// # Examples
///
/// ```rust
/// use heapscope::Error;
///
/// fn describe(err: &Error) -> &'static str {
///     match err {
///         Error::SnapshotNotReady(_) => "load a walkable snapshot first",
///         Error::Cancelled => "analysis was cancelled",
///         _ => "analysis failed",
///     }
/// }
///
/// assert_eq!(describe(&Error::Cancelled), "analysis was cancelled");
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The heap snapshot cannot be traversed.
    ///
    /// Raised when the provider reports that the heap is not walkable, or when an
    /// operation is requested on a session that was never initialized with a snapshot.
    /// The associated string explains which precondition failed.
    #[error("Heap snapshot is not ready - {0}")]
    SnapshotNotReady(String),

    /// The operation observed a cancellation request and unwound.
    ///
    /// Partial results are discarded; nothing computed during the cancelled
    /// traversal is cached.
    #[error("The analysis was cancelled")]
    Cancelled,

    /// An object address could not be resolved against the snapshot.
    #[error("Object at {0} could not be resolved")]
    InvalidObject(Address),

    /// A traversal reached its configured bound.
    ///
    /// # Fields
    ///
    /// * `what` - Which bound was reached (e.g. "visited nodes", "path depth")
    /// * `limit` - The configured value of that bound
    #[error("Traversal exceeded the {what} limit of {limit}")]
    ResourceCapExceeded {
        /// Name of the exhausted bound
        what: &'static str,
        /// The configured limit
        limit: usize,
    },

    /// Generic error for miscellaneous failures.
    ///
    /// Used by snapshot providers to surface failures that do not fit any
    /// other category.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns `true` for failures that abort an entire operation.
    ///
    /// The remaining variants concern a single object or query; an analysis run
    /// continues past them.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SnapshotNotReady(_) | Error::Cancelled | Error::Error(_)
        )
    }
}
