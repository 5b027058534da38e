//! Reclamation queues.
//!
//! A [`ReclamationQueue`] is the channel through which a collector tells the
//! application that a target has become unreachable. The collector appends
//! cleared references; the application either polls without blocking or
//! blocks in [`remove`](ReclamationQueue::remove) until one arrives.

use crate::cancel::{CancelToken, Wake};
use crate::reference::TieredReference;
use core_types::{ReclaimError, ReclaimResult};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// State shared between queue handles and the references bound to it.
pub(crate) struct QueueShared<T> {
    /// Cleared references in collector insertion order
    items: Mutex<VecDeque<TieredReference<T>>>,
    /// Signalled once per appended reference
    available: Condvar,
}

impl<T: Send + Sync> Wake for QueueShared<T> {
    fn wake_all(&self) {
        let _items = self.items.lock();
        self.available.notify_all();
    }
}

/// A FIFO queue of references whose targets have been reclaimed.
///
/// Cloning a queue yields another handle to the same queue. References hold
/// only a weak back-reference to their queue, so the queue lives exactly as
/// long as the application keeps a handle to it.
pub struct ReclamationQueue<T> {
    shared: Arc<QueueShared<T>>,
}

impl<T> ReclamationQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        ReclamationQueue {
            shared: Arc::new(QueueShared {
                items: Mutex::new(VecDeque::new()),
                available: Condvar::new(),
            }),
        }
    }

    /// Removes and returns the oldest enqueued reference without blocking.
    ///
    /// Returns `None` immediately if the queue is empty.
    pub fn poll(&self) -> Option<TieredReference<T>> {
        self.shared.items.lock().pop_front()
    }

    /// Removes and returns the oldest enqueued reference, blocking until one
    /// is available.
    ///
    /// With `Some(timeout)` the call returns `None` once the timeout has
    /// elapsed without an insertion; with `None` it waits indefinitely.
    pub fn remove(&self, timeout: Option<Duration>) -> Option<TieredReference<T>> {
        let deadline = deadline_after(timeout);
        let mut items = self.shared.items.lock();
        loop {
            if let Some(reference) = items.pop_front() {
                return Some(reference);
            }
            if !self.wait(&mut items, deadline) {
                return items.pop_front();
            }
        }
    }

    /// Like [`remove`](ReclamationQueue::remove), but also returns when
    /// `token` is cancelled.
    ///
    /// A reference that is already available is returned even if the token
    /// has been cancelled. Otherwise a cancelled token yields
    /// [`ReclaimError::Cancelled`], and an elapsed timeout yields `Ok(None)`.
    pub fn remove_cancellable(
        &self,
        timeout: Option<Duration>,
        token: &CancelToken,
    ) -> ReclaimResult<Option<TieredReference<T>>>
    where
        T: Send + Sync + 'static,
    {
        let waiter: Weak<QueueShared<T>> = Arc::downgrade(&self.shared);
        token.register(waiter);

        let deadline = deadline_after(timeout);
        let mut items = self.shared.items.lock();
        loop {
            if let Some(reference) = items.pop_front() {
                return Ok(Some(reference));
            }
            if token.is_cancelled() {
                return Err(ReclaimError::Cancelled);
            }
            if !self.wait(&mut items, deadline) {
                return Ok(items.pop_front());
            }
        }
    }

    /// Returns the number of references waiting to be picked up.
    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    /// Returns true if no references are waiting.
    pub fn is_empty(&self) -> bool {
        self.shared.items.lock().is_empty()
    }

    /// Returns true if both handles denote the same queue.
    pub fn same_queue(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Clears `reference`, sets its enqueued flag and appends it, all under
    /// the queue lock, then wakes one waiter.
    ///
    /// A consumer never observes the flag without the reference being in the
    /// queue. Returns false if the reference had already been processed.
    pub(crate) fn clear_and_enqueue(&self, reference: &TieredReference<T>) -> bool {
        let mut items = self.shared.items.lock();
        if !reference.clear_and_mark() {
            return false;
        }
        items.push_back(reference.clone());
        self.shared.available.notify_one();
        true
    }

    pub(crate) fn downgrade(&self) -> Weak<QueueShared<T>> {
        Arc::downgrade(&self.shared)
    }

    pub(crate) fn from_shared(shared: Arc<QueueShared<T>>) -> Self {
        ReclamationQueue { shared }
    }

    /// Waits for a signal. Returns false once the deadline has passed.
    fn wait(
        &self,
        items: &mut MutexGuard<'_, VecDeque<TieredReference<T>>>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            Some(deadline) => !self.shared.available.wait_until(items, deadline).timed_out(),
            None => {
                self.shared.available.wait(items);
                true
            }
        }
    }
}

/// A timeout too large to represent as an instant means "wait forever".
fn deadline_after(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|timeout| Instant::now().checked_add(timeout))
}

impl<T> Clone for ReclamationQueue<T> {
    fn clone(&self) -> Self {
        ReclamationQueue {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for ReclamationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ReclamationQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReclamationQueue")
            .field("len", &self.len())
            .finish()
    }
}
