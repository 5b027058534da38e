//! Tiered references.
//!
//! A [`TieredReference`] observes a target without keeping it alive. The
//! application creates it from a strong handle and may bind it to a
//! [`ReclamationQueue`]; from then on all mutation is driven by a collector,
//! which clears the reference and posts it to its queue once the target is no
//! longer strongly reachable.

use crate::queue::{QueueShared, ReclamationQueue};
use core_types::{Reachability, ReachabilityTier, ReferenceId};
use parking_lot::Mutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

struct ReferenceInner<T> {
    id: ReferenceId,
    tier: ReachabilityTier,
    /// Observation slot. `None` once the collector has cleared the reference.
    target: Mutex<Option<Weak<T>>>,
    /// Queue to notify; the reference never keeps its queue alive
    queue: Option<Weak<QueueShared<T>>>,
    enqueued: AtomicBool,
    /// Set once a collector has taken this reference into its registry
    registered: AtomicBool,
}

/// A handle that observes a target at a declared reachability tier.
///
/// Cloning a `TieredReference` yields another handle to the same reference
/// instance: clones share the cleared state and the enqueued flag, and
/// compare equal to each other. The reference returned by
/// [`ReclamationQueue::poll`] is therefore equal to the one the application
/// created.
///
/// # Examples
///
/// ```
/// use reference_queue::{ReclamationQueue, TieredReference};
/// use std::sync::Arc;
///
/// let queue = ReclamationQueue::new();
/// let target = Arc::new(String::from("save point"));
///
/// let weak = TieredReference::weak(&target, Some(&queue));
/// assert_eq!(weak.get().as_deref(), Some(&String::from("save point")));
///
/// let phantom = TieredReference::phantom(&target, Some(&queue));
/// assert!(phantom.get().is_none());
/// assert!(!phantom.is_enqueued());
/// ```
pub struct TieredReference<T> {
    inner: Arc<ReferenceInner<T>>,
}

impl<T> TieredReference<T> {
    /// Creates a reference to `target` at the given tier.
    ///
    /// If a queue is supplied, the reference is posted to it when a collector
    /// clears the reference. The reference does not keep the queue alive.
    pub fn new(
        target: &Arc<T>,
        tier: ReachabilityTier,
        queue: Option<&ReclamationQueue<T>>,
    ) -> Self {
        TieredReference {
            inner: Arc::new(ReferenceInner {
                id: ReferenceId::next(),
                tier,
                target: Mutex::new(Some(Arc::downgrade(target))),
                queue: queue.map(ReclamationQueue::downgrade),
                enqueued: AtomicBool::new(false),
                registered: AtomicBool::new(false),
            }),
        }
    }

    /// Creates a [`ReachabilityTier::Weak`] reference.
    pub fn weak(target: &Arc<T>, queue: Option<&ReclamationQueue<T>>) -> Self {
        Self::new(target, ReachabilityTier::Weak, queue)
    }

    /// Creates a [`ReachabilityTier::Phantom`] reference.
    pub fn phantom(target: &Arc<T>, queue: Option<&ReclamationQueue<T>>) -> Self {
        Self::new(target, ReachabilityTier::Phantom, queue)
    }

    /// Returns the target if it can still be retrieved.
    ///
    /// Weak references return the target until it is reclaimed or the
    /// reference is cleared. Phantom references always return `None`, both
    /// before and after clearing.
    pub fn get(&self) -> Option<Arc<T>> {
        if !self.inner.tier.allows_retrieval() {
            return None;
        }
        self.inner.target.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Returns true once a collector has processed this reference.
    ///
    /// The flag reflects "was enqueued", not "is still queued": it stays true
    /// after the reference has been polled or removed from its queue.
    pub fn is_enqueued(&self) -> bool {
        self.inner.enqueued.load(Ordering::Acquire)
    }

    /// Returns the declared tier.
    pub fn tier(&self) -> ReachabilityTier {
        self.inner.tier
    }

    /// Returns the identity of this reference.
    pub fn id(&self) -> ReferenceId {
        self.inner.id
    }

    /// Returns true if the reference was bound to a queue at construction.
    pub fn has_queue(&self) -> bool {
        self.inner.queue.is_some()
    }

    /// Tests whether this reference observes `candidate`.
    ///
    /// Works for both tiers without handing out the target. Returns false once
    /// the reference has been cleared or the target reclaimed.
    pub fn refers_to(&self, candidate: &Arc<T>) -> bool {
        match self.inner.target.lock().as_ref() {
            Some(target) => {
                target.strong_count() > 0 && std::ptr::eq(target.as_ptr(), Arc::as_ptr(candidate))
            }
            None => false,
        }
    }

    /// Returns true if both handles denote the same reference instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Observes how strongly the target is currently reachable.
    pub(crate) fn reachability(&self) -> Reachability {
        match self.inner.target.lock().as_ref() {
            Some(target) if target.strong_count() > 0 => Reachability::Strong,
            _ => Reachability::Unreachable,
        }
    }

    /// Clears the target slot and sets the enqueued flag as one step.
    ///
    /// Returns false if the reference had already been processed, which is a
    /// collector bug and asserts in debug builds.
    pub(crate) fn clear_and_mark(&self) -> bool {
        let mut slot = self.inner.target.lock();
        let first = self
            .inner
            .enqueued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        debug_assert!(first, "{} processed twice by a collector", self.inner.id);
        if first {
            *slot = None;
        }
        first
    }

    /// Marks the reference as owned by a collector.
    ///
    /// Returns false if some collector already claimed it.
    pub(crate) fn claim_registration(&self) -> bool {
        self.inner
            .registered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns the bound queue, if it was supplied and is still alive.
    pub(crate) fn queue(&self) -> Option<ReclamationQueue<T>> {
        self.inner
            .queue
            .as_ref()?
            .upgrade()
            .map(ReclamationQueue::from_shared)
    }
}

impl<T> Clone for TieredReference<T> {
    fn clone(&self) -> Self {
        TieredReference {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for TieredReference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for TieredReference<T> {}

impl<T> Hash for TieredReference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> fmt::Debug for TieredReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredReference")
            .field("id", &self.inner.id)
            .field("tier", &self.inner.tier)
            .field("enqueued", &self.is_enqueued())
            .finish()
    }
}

impl<T> fmt::Display for TieredReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.inner.tier, self.inner.id)
    }
}
