//! Synchronization utilities for cooperative cancellation.
//!
//! Every unbounded loop in this crate (object enumeration, breadth-first index
//! construction, depth-first cycle search, retained-size traversals) polls a
//! [`CancellationToken`] once per iteration. Cancellation is cooperative: the loop
//! notices the flag, discards its partial state and returns [`Error::Cancelled`].
//!
//! # Key Components
//!
//! - [`CancellationToken`] - A cloneable, thread-safe cancellation flag

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{Error, Result};

/// A cloneable cancellation flag shared between a caller and running analyses.
///
/// Clones share the same underlying flag, so a token handed to another thread can
/// cancel a traversal running on the analysis thread. Once cancelled, a token stays
/// cancelled.
///
/// # Examples
///
/// ```rust
/// use heapscope::utils::CancellationToken;
///
/// let token = CancellationToken::new();
/// let remote = token.clone();
///
/// assert!(token.check().is_ok());
/// remote.cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every operation observing this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](CancellationToken::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Polls the token from inside a traversal loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_token_starts_active() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();

        thread::spawn(move || remote.cancel()).join().unwrap();

        assert!(token.is_cancelled());
    }
}
