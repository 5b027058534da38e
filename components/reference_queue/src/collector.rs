//! Simulated collector actor.
//!
//! The [`Collector`] plays the part a garbage collector plays in a managed
//! runtime. It keeps a registry of tiered references and, on every scan,
//! processes each reference whose target is no longer strongly reachable:
//!
//! 1. Runs the cleanup callback registered for the reference, if any
//! 2. Clears the reference and sets its enqueued flag
//! 3. Appends the reference to its bound queue, if the queue is still alive
//!
//! Each reference is processed at most once. Within one scan, weak references
//! are processed before phantom references, in registration order within each
//! tier; that order is what the queues observe.
//!
//! Scans run either synchronously through [`Collector::collect`] or on a
//! background thread started with [`Collector::start_thread`], which scans
//! periodically and on [`Collector::request_collection`].

use crate::queue::ReclamationQueue;
use crate::reference::TieredReference;
use core_types::{Reachability, ReachabilityTier, ReclaimResult, ReferenceId};
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Configuration for a collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Time between periodic scans on the background thread
    pub scan_interval: Duration,
    /// Whether `start_thread` spawns a background thread
    pub use_collector_thread: bool,
    /// Name given to the background thread
    pub thread_name: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        CollectorConfig {
            scan_interval: Duration::from_millis(50),
            use_collector_thread: true,
            thread_name: "reference-collector".into(),
        }
    }
}

/// Cumulative statistics for a collector.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectorStats {
    /// Number of scans completed
    pub cycles_completed: u64,
    /// References cleared (with or without a queue)
    pub references_cleared: u64,
    /// References appended to a live queue
    pub references_enqueued: u64,
    /// Cleanup callbacks that ran to completion
    pub cleanups_run: u64,
    /// Cleanup callbacks that panicked
    pub cleanup_panics: u64,
    /// References currently registered and not yet processed
    pub tracked: usize,
}

/// Outcome of a single scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    /// References examined
    pub scanned: usize,
    /// References cleared
    pub cleared: usize,
    /// References appended to a live queue
    pub enqueued: usize,
    /// Cleanup callbacks that ran to completion
    pub cleanups_run: usize,
    /// Cleanup callbacks that panicked
    pub cleanup_panics: usize,
}

/// What happened to a reference when the collector processed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reclaimed {
    /// Cleared and appended to its queue
    Enqueued,
    /// Cleared; no queue was bound
    NoQueue,
    /// Cleared; the bound queue no longer exists
    QueueDropped,
    /// Already processed before; nothing done
    AlreadyProcessed,
}

/// Type-erased view of a tiered reference, as seen by the collector.
pub(crate) trait Trackable: Send + Sync {
    fn id(&self) -> ReferenceId;
    fn tier(&self) -> ReachabilityTier;
    fn reachability(&self) -> Reachability;
    fn is_enqueued(&self) -> bool;
    fn reclaim(&self) -> Reclaimed;
}

impl<T: Send + Sync + 'static> Trackable for TieredReference<T> {
    fn id(&self) -> ReferenceId {
        TieredReference::id(self)
    }

    fn tier(&self) -> ReachabilityTier {
        TieredReference::tier(self)
    }

    fn reachability(&self) -> Reachability {
        TieredReference::reachability(self)
    }

    fn is_enqueued(&self) -> bool {
        TieredReference::is_enqueued(self)
    }

    fn reclaim(&self) -> Reclaimed {
        if !self.has_queue() {
            if self.clear_and_mark() {
                return Reclaimed::NoQueue;
            }
            return Reclaimed::AlreadyProcessed;
        }
        match self.queue() {
            // Flag and queue entry change under the queue lock
            Some(queue) if queue.clear_and_enqueue(self) => Reclaimed::Enqueued,
            Some(_) => Reclaimed::AlreadyProcessed,
            None if self.clear_and_mark() => Reclaimed::QueueDropped,
            None => Reclaimed::AlreadyProcessed,
        }
    }
}

type Cleanup = Box<dyn FnOnce() + Send>;

struct Registration {
    reference: Box<dyn Trackable>,
    cleanup: Option<Cleanup>,
}

impl Registration {
    fn is_eligible(&self) -> bool {
        self.reference
            .tier()
            .is_eligible(self.reference.reachability())
    }
}

/// Message types for the collector thread.
enum CollectorMessage {
    /// Run a scan now
    Collect,
    /// Stop the collector thread
    Stop,
}

/// State shared between the collector handle and its thread.
struct CollectorShared {
    registry: Mutex<Vec<Registration>>,
    stats: RwLock<CollectorStats>,
    /// Completed cycle count, guarded for `cycle_done`
    cycles: Mutex<u64>,
    cycle_done: Condvar,
}

impl CollectorShared {
    fn new() -> Self {
        CollectorShared {
            registry: Mutex::new(Vec::new()),
            stats: RwLock::new(CollectorStats::default()),
            cycles: Mutex::new(0),
            cycle_done: Condvar::new(),
        }
    }

    /// Performs one scan over the registry.
    fn scan(&self) -> CollectionReport {
        // Eligible entries leave the registry under the lock, so concurrent
        // scans can never process the same reference.
        let (eligible, scanned) = {
            let mut registry = self.registry.lock();
            let scanned = registry.len();
            let (eligible, live): (Vec<_>, Vec<_>) =
                registry.drain(..).partition(Registration::is_eligible);
            *registry = live;
            (eligible, scanned)
        };

        let (weak, phantom): (Vec<_>, Vec<_>) = eligible
            .into_iter()
            .partition(|r| r.reference.tier() == ReachabilityTier::Weak);

        let mut report = CollectionReport {
            scanned,
            ..Default::default()
        };
        for registration in weak.into_iter().chain(phantom) {
            Self::process(registration, &mut report);
        }

        {
            let mut stats = self.stats.write();
            stats.references_cleared += report.cleared as u64;
            stats.references_enqueued += report.enqueued as u64;
            stats.cleanups_run += report.cleanups_run as u64;
            stats.cleanup_panics += report.cleanup_panics as u64;
        }

        let cycle = {
            let mut cycles = self.cycles.lock();
            *cycles += 1;
            self.cycle_done.notify_all();
            *cycles
        };

        log::debug!(
            "collection cycle {}: scanned {}, cleared {}, enqueued {}",
            cycle,
            report.scanned,
            report.cleared,
            report.enqueued
        );
        report
    }

    fn process(registration: Registration, report: &mut CollectionReport) {
        let Registration { reference, cleanup } = registration;
        let id = reference.id();

        if reference.is_enqueued() {
            log::warn!("{} was already processed elsewhere; skipping", id);
            return;
        }

        if let Some(cleanup) = cleanup {
            match panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                Ok(()) => report.cleanups_run += 1,
                Err(_) => {
                    report.cleanup_panics += 1;
                    log::error!("cleanup callback for {} panicked", id);
                }
            }
        }

        match reference.reclaim() {
            Reclaimed::Enqueued => {
                report.cleared += 1;
                report.enqueued += 1;
                log::trace!("{} cleared and enqueued", id);
            }
            Reclaimed::NoQueue => {
                report.cleared += 1;
                log::trace!("{} cleared", id);
            }
            Reclaimed::QueueDropped => {
                report.cleared += 1;
                log::warn!("{} cleared but its queue has been dropped", id);
            }
            Reclaimed::AlreadyProcessed => {
                log::error!("{} was already processed; skipping", id);
            }
        }
    }
}

/// A collector that clears tiered references and posts them to their queues.
///
/// # Examples
///
/// ```
/// use reference_queue::{Collector, ReclamationQueue};
/// use std::sync::Arc;
///
/// let collector = Collector::new();
/// let queue = ReclamationQueue::new();
///
/// let target = Arc::new("save point");
/// let reference = collector.weak(&target, Some(&queue));
///
/// // Still strongly reachable: nothing happens
/// collector.collect();
/// assert!(queue.poll().is_none());
///
/// drop(target);
/// collector.collect();
/// assert_eq!(queue.poll(), Some(reference.clone()));
/// assert!(reference.get().is_none());
/// ```
pub struct Collector {
    config: CollectorConfig,
    shared: Arc<CollectorShared>,
    /// Handle to the collector thread
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    /// Channel for sending messages to the collector thread
    sender: Mutex<Option<Sender<CollectorMessage>>>,
}

impl Collector {
    /// Creates a collector with default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectorConfig::default())
    }

    /// Creates a collector with custom configuration.
    pub fn with_config(config: CollectorConfig) -> Self {
        Collector {
            config,
            shared: Arc::new(CollectorShared::new()),
            thread_handle: Mutex::new(None),
            sender: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Makes a reference discoverable by this collector.
    pub fn register<T>(&self, reference: &TieredReference<T>)
    where
        T: Send + Sync + 'static,
    {
        self.track(reference, None);
    }

    /// Makes a reference discoverable and attaches a cleanup callback.
    ///
    /// The callback runs once, on the collector, when the reference is
    /// processed and before it is enqueued. It has no access to the target.
    pub fn register_with_cleanup<T, F>(&self, reference: &TieredReference<T>, cleanup: F)
    where
        T: Send + Sync + 'static,
        F: FnOnce() + Send + 'static,
    {
        self.track(reference, Some(Box::new(cleanup)));
    }

    /// Creates a weak reference and registers it.
    pub fn weak<T>(
        &self,
        target: &Arc<T>,
        queue: Option<&ReclamationQueue<T>>,
    ) -> TieredReference<T>
    where
        T: Send + Sync + 'static,
    {
        let reference = TieredReference::weak(target, queue);
        self.register(&reference);
        reference
    }

    /// Creates a phantom reference and registers it.
    pub fn phantom<T>(
        &self,
        target: &Arc<T>,
        queue: Option<&ReclamationQueue<T>>,
    ) -> TieredReference<T>
    where
        T: Send + Sync + 'static,
    {
        let reference = TieredReference::phantom(target, queue);
        self.register(&reference);
        reference
    }

    fn track<T>(&self, reference: &TieredReference<T>, cleanup: Option<Cleanup>)
    where
        T: Send + Sync + 'static,
    {
        if reference.is_enqueued() {
            log::warn!("{} is already enqueued; not registering", reference);
            return;
        }

        // A reference belongs to the first collector that registers it
        if !reference.claim_registration() {
            log::warn!("{} is already registered with a collector", reference);
            return;
        }

        self.shared.registry.lock().push(Registration {
            reference: Box::new(reference.clone()),
            cleanup,
        });
        log::trace!("registered {}", reference);
    }

    /// Runs one scan on the calling thread.
    pub fn collect(&self) -> CollectionReport {
        self.shared.scan()
    }

    /// Starts the background collector thread.
    ///
    /// Does nothing if the thread is already running or if the configuration
    /// disables it.
    pub fn start_thread(&self) -> ReclaimResult<()> {
        if !self.config.use_collector_thread {
            return Ok(());
        }

        let mut handle_guard = self.thread_handle.lock();
        if handle_guard.is_some() {
            return Ok(());
        }

        let (sender, receiver) = channel::unbounded::<CollectorMessage>();
        let shared = Arc::clone(&self.shared);
        let interval = self.config.scan_interval;

        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || {
                log::debug!("collector thread started, scanning every {:?}", interval);
                loop {
                    match receiver.recv_timeout(interval) {
                        Ok(CollectorMessage::Collect) | Err(RecvTimeoutError::Timeout) => {
                            shared.scan();
                        }
                        Ok(CollectorMessage::Stop) | Err(RecvTimeoutError::Disconnected) => {
                            break;
                        }
                    }
                }
                log::debug!("collector thread stopped");
            })?;

        *self.sender.lock() = Some(sender);
        *handle_guard = Some(handle);
        Ok(())
    }

    /// Stops the background collector thread and waits for it to exit.
    pub fn stop_thread(&self) {
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(CollectorMessage::Stop);
        }

        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.join().is_err() {
                log::error!("collector thread panicked");
            }
        }
    }

    /// Returns true while the background thread is running.
    pub fn is_running(&self) -> bool {
        self.thread_handle.lock().is_some()
    }

    /// Asks for a scan as soon as possible.
    ///
    /// Signals the background thread if it is running, otherwise scans
    /// synchronously.
    pub fn request_collection(&self) {
        if let Some(sender) = self.sender.lock().as_ref() {
            if sender.send(CollectorMessage::Collect).is_ok() {
                return;
            }
        }
        self.collect();
    }

    /// Returns the number of completed scans.
    pub fn cycles_completed(&self) -> u64 {
        *self.shared.cycles.lock()
    }

    /// Waits until more than `after` scans have completed.
    ///
    /// Returns false if the timeout elapses first.
    pub fn wait_for_cycle(&self, after: u64, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut cycles = self.shared.cycles.lock();
        while *cycles <= after {
            match deadline {
                Some(deadline) => {
                    if self.shared.cycle_done.wait_until(&mut cycles, deadline).timed_out() {
                        return *cycles > after;
                    }
                }
                None => self.shared.cycle_done.wait(&mut cycles),
            }
        }
        true
    }

    /// Returns the number of registered references not yet processed.
    pub fn tracked_count(&self) -> usize {
        self.shared.registry.lock().len()
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> CollectorStats {
        let mut stats = self.shared.stats.read().clone();
        stats.cycles_completed = self.cycles_completed();
        stats.tracked = self.tracked_count();
        stats
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
