//! Shared utilities: cooperative cancellation and display formatting.

mod format;
mod synchronization;

pub use format::{format_bytes, format_count};
pub use synchronization::CancellationToken;
