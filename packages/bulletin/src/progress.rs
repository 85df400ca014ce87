//! Progress reporting callback for long-running bulletin operations.
//!
//! The bulletin crate stays free of any terminal UI dependency; callers
//! that want a progress bar implement [`ProgressCallback`] (the CLI wires
//! in an indicatif-backed implementation) and everyone else passes
//! [`null_progress`].

use std::sync::Arc;

/// Callback interface for reporting fetch progress.
///
/// Implementations must be thread-safe since fetches run inside tokio
/// tasks and `Arc`-based sharing.
pub trait ProgressCallback: Send + Sync {
    /// Sets the total number of expected records, if known.
    fn set_total(&self, total: u64);

    /// Sets the current absolute position.
    fn set_position(&self, pos: u64);

    /// Increments the current position by `delta`.
    fn inc(&self, delta: u64);

    /// Replaces the progress message.
    fn set_message(&self, msg: String);

    /// Finishes with a final message, leaving it visible.
    fn finish(&self, msg: String);

    /// Finishes and removes any visible progress output.
    fn finish_and_clear(&self);
}

/// No-op progress callback for non-interactive callers.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn set_position(&self, _pos: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}

/// Returns a shared no-op progress callback.
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
