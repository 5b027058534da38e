//! Cancellation of blocking queue waits.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Something a cancellation must wake up.
///
/// Implementors must take the same lock their waiters sleep under before
/// notifying, so a waiter that checked the token just before cancellation
/// cannot miss the wakeup.
pub(crate) trait Wake: Send + Sync {
    fn wake_all(&self);
}

struct CancelState {
    cancelled: AtomicBool,
    waiters: Mutex<Vec<Weak<dyn Wake>>>,
}

/// A cancellation signal tied to the caller's lifecycle.
///
/// Pass a token to [`ReclamationQueue::remove_cancellable`]; calling
/// [`cancel`](CancelToken::cancel) from any thread wakes every wait using the
/// token. Clones share the same signal. Cancellation is permanent.
///
/// [`ReclamationQueue::remove_cancellable`]: crate::ReclamationQueue::remove_cancellable
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        CancelToken {
            state: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                waiters: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Cancels the token and wakes all waits blocked on it.
    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let waiters = std::mem::take(&mut *self.state.waiters.lock());
        log::trace!("cancelling {} registered wait(s)", waiters.len());
        for waiter in waiters.iter().filter_map(Weak::upgrade) {
            waiter.wake_all();
        }
    }

    /// Returns true once [`cancel`](CancelToken::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a waiter to be woken on cancellation.
    ///
    /// Must be called before the waiter takes its own lock.
    pub(crate) fn register(&self, waiter: Weak<dyn Wake>) {
        let mut waiters = self.state.waiters.lock();
        waiters.retain(|w| w.strong_count() > 0);
        if !waiters.iter().any(|w| w.ptr_eq(&waiter)) {
            waiters.push(waiter);
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
