//! Reference Queue - tiered references with reclamation notification
//!
//! This component provides:
//! - Tiered references (`Weak`, `Phantom`) that observe a target without
//!   keeping it alive
//! - Reclamation queues that report references whose targets have become
//!   unreachable, with non-blocking, blocking and cancellable retrieval
//! - A collector actor that discovers unreachable targets, runs per-target
//!   cleanup callbacks, clears references and posts them to their queues
//!
//! # Examples
//!
//! ```
//! use reference_queue::{Collector, CollectorConfig, ReclamationQueue};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let collector = Collector::with_config(CollectorConfig {
//!     scan_interval: Duration::from_millis(10),
//!     ..Default::default()
//! });
//! collector.start_thread().unwrap();
//!
//! let queue = ReclamationQueue::new();
//! let target = Arc::new(vec![0u8; 1024]);
//! let reference = collector.phantom(&target, Some(&queue));
//! assert!(reference.get().is_none());
//!
//! drop(target);
//! let removed = queue.remove(Some(Duration::from_secs(5))).unwrap();
//! assert_eq!(removed, reference);
//! assert!(removed.is_enqueued());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cancel;
pub mod collector;
pub mod queue;
pub mod reference;

// Re-export main types
pub use cancel::CancelToken;
pub use collector::{CollectionReport, Collector, CollectorConfig, CollectorStats};
pub use core_types::{Reachability, ReachabilityTier, ReclaimError, ReclaimResult, ReferenceId};
pub use queue::ReclamationQueue;
pub use reference::TieredReference;
