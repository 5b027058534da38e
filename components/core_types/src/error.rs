//! Error types for reference tracking.
//!
//! Most outcomes in this crate family are not errors: a phantom `get()` or a
//! timed out `remove` report an absent value. Only the cases below are
//! surfaced as failures.

use thiserror::Error;

/// Errors reported by reclamation queues and collectors.
#[derive(Debug, Error)]
pub enum ReclaimError {
    /// A cancellable blocking remove was cancelled by its caller
    #[error("wait for reclaimed reference was cancelled")]
    Cancelled,

    /// The background collector thread could not be started
    #[error("failed to spawn collector thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

impl ReclaimError {
    /// Returns true if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReclaimError::Cancelled)
    }
}

/// Result type for reclamation operations.
pub type ReclaimResult<T> = Result<T, ReclaimError>;
