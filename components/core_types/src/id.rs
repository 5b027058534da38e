//! Reference identities.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identity of a tiered reference.
///
/// Identities are handed out from a monotonically increasing counter and are
/// never reused, so two references compare equal only if they are the same
/// reference instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReferenceId(u64);

impl ReferenceId {
    /// Allocates the next unused identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ReferenceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identity.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref#{}", self.0)
    }
}
