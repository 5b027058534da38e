//! End-to-End Reclamation Tests
//!
//! Drives the full flow: the application creates a target, wraps it in a
//! tiered reference bound to a queue, drops its strong handles, and learns
//! about the reclamation through the queue once the collector has run.

use reference_queue::{Collector, CollectorConfig, ReclamationQueue, TieredReference};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A target with some payload, standing in for an application object.
struct SavePoint {
    name: String,
    _payload: Vec<u8>,
}

impl SavePoint {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(SavePoint {
            name: name.to_string(),
            _payload: vec![0; 4096],
        })
    }
}

/// Test: weak reference end to end with a synchronous collector
#[test]
fn test_weak_reference_end_to_end() {
    init_logging();
    let collector = Collector::with_config(CollectorConfig {
        use_collector_thread: false,
        ..Default::default()
    });
    let queue = ReclamationQueue::new();

    let x = SavePoint::new("SavePoint");
    let reference = TieredReference::weak(&x, Some(&queue));
    collector.register(&reference);

    // Strongly reachable: a collection changes nothing
    collector.collect();
    assert!(queue.poll().is_none(), "Queue should be empty while X is reachable");
    assert_eq!(reference.get().map(|p| p.name.clone()), Some("SavePoint".to_string()));

    drop(x);
    collector.collect();

    let polled = queue.poll().expect("Reference should have been enqueued");
    assert!(polled.ptr_eq(&reference), "Polled reference should be the one created for X");
    assert!(polled.get().is_none(), "Cleared reference should not return X");
    assert!(polled.is_enqueued());
    assert!(queue.poll().is_none(), "Second poll should find nothing");
}

/// Test: phantom reference end to end with a background collector
#[test]
fn test_phantom_reference_end_to_end() {
    init_logging();
    let collector = Collector::with_config(CollectorConfig {
        scan_interval: Duration::from_millis(10),
        ..Default::default()
    });
    collector.start_thread().expect("collector thread should start");
    let queue = ReclamationQueue::new();

    let x = SavePoint::new("phantom");
    let reference = collector.phantom(&x, Some(&queue));
    assert!(reference.get().is_none(), "Phantom get must be absent before clearing");

    // Let a few scans pass while X is still reachable
    let cycles = collector.cycles_completed();
    assert!(collector.wait_for_cycle(cycles + 2, Duration::from_secs(5)));
    assert!(queue.poll().is_none());
    assert!(reference.get().is_none());

    drop(x);
    let start = Instant::now();
    let removed = queue
        .remove(Some(Duration::from_secs(1)))
        .expect("Reference should arrive within the timeout");

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(removed, reference);
    assert!(removed.get().is_none(), "Phantom get must be absent after clearing");
    assert!(removed.is_enqueued());
}

/// Test: many targets, one queue, FIFO by discovery
#[test]
fn test_single_queue_many_targets() {
    let collector = Collector::with_config(CollectorConfig {
        use_collector_thread: false,
        ..Default::default()
    });
    let queue = ReclamationQueue::new();

    let targets: Vec<_> = (0..5).map(|i| SavePoint::new(&format!("sp{}", i))).collect();
    let refs: Vec<_> = targets
        .iter()
        .map(|t| collector.weak(t, Some(&queue)))
        .collect();

    // Release in reverse order, one collection per release
    let mut targets = targets;
    while let Some(target) = targets.pop() {
        drop(target);
        collector.collect();
    }

    for expected in refs.iter().rev() {
        assert_eq!(queue.poll().as_ref(), Some(expected));
    }
    assert!(queue.is_empty());
}
