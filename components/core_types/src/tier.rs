//! Reachability tiers for tiered references.
//!
//! A tier is declared once, when a reference is created, and decides two
//! things: whether the target can be retrieved through the reference, and how
//! weakly reachable the target must become before a collector may clear the
//! reference and report it.

use std::fmt;

/// How strongly a target is currently reachable, as observed by a collector.
///
/// Variants are ordered from weakest to strongest, so a comparison such as
/// `observed <= Reachability::Weak` reads as "reachable at most weakly".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reachability {
    /// No path to the target remains; its storage has been reclaimed
    Unreachable,
    /// Reachable only through phantom references
    Phantom,
    /// Reachable only through weak references (or weaker)
    Weak,
    /// Reachable through at least one ordinary owning handle
    Strong,
}

/// The declared tier of a tiered reference.
///
/// # Examples
///
/// ```
/// use core_types::{Reachability, ReachabilityTier};
///
/// assert!(ReachabilityTier::Weak.allows_retrieval());
/// assert!(!ReachabilityTier::Phantom.allows_retrieval());
///
/// // A strongly reachable target never makes a reference eligible
/// assert!(!ReachabilityTier::Weak.is_eligible(Reachability::Strong));
/// assert!(ReachabilityTier::Weak.is_eligible(Reachability::Unreachable));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReachabilityTier {
    /// Target is retrievable until the collector clears the reference
    Weak,
    /// Target is never retrievable; the reference only signals reclamation
    Phantom,
}

impl ReachabilityTier {
    /// Returns true if `get()` may hand out the target at this tier.
    pub fn allows_retrieval(self) -> bool {
        matches!(self, ReachabilityTier::Weak)
    }

    /// Returns the reachability level this tier corresponds to.
    pub fn level(self) -> Reachability {
        match self {
            ReachabilityTier::Weak => Reachability::Weak,
            ReachabilityTier::Phantom => Reachability::Phantom,
        }
    }

    /// Returns true if a reference of this tier may be cleared and enqueued
    /// when its target is observed at `observed` reachability.
    ///
    /// A reference is never eligible while its target is reachable at a
    /// strictly stronger tier than the one declared.
    pub fn is_eligible(self, observed: Reachability) -> bool {
        observed <= self.level()
    }

    /// Returns the tier name as it appears in reference descriptions.
    pub fn name(self) -> &'static str {
        match self {
            ReachabilityTier::Weak => "WeakReference",
            ReachabilityTier::Phantom => "PhantomReference",
        }
    }
}

impl fmt::Display for ReachabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
