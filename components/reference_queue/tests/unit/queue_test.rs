//! Unit tests for ReclamationQueue

use reference_queue::{CancelToken, Collector, CollectorConfig, ReclaimError, ReclamationQueue};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn sync_collector() -> Collector {
    Collector::with_config(CollectorConfig {
        use_collector_thread: false,
        ..Default::default()
    })
}

#[test]
fn poll_on_empty_queue_returns_immediately() {
    super::init_logging();
    let queue: ReclamationQueue<String> = ReclamationQueue::new();

    let start = Instant::now();
    for _ in 0..1000 {
        assert!(queue.poll().is_none());
    }
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn poll_returns_references_in_collector_order() {
    let collector = sync_collector();
    let queue = ReclamationQueue::new();
    let targets: Vec<_> = (0..3).map(Arc::new).collect();
    let refs: Vec<_> = targets
        .iter()
        .map(|t| collector.weak(t, Some(&queue)))
        .collect();

    drop(targets);
    collector.collect();

    assert_eq!(queue.poll().as_ref(), Some(&refs[0]));
    assert_eq!(queue.poll().as_ref(), Some(&refs[1]));
    assert_eq!(queue.poll().as_ref(), Some(&refs[2]));
    assert!(queue.poll().is_none());
}

#[test]
fn order_follows_discovery_not_registration() {
    let collector = sync_collector();
    let queue = ReclamationQueue::new();
    let first = Arc::new(1);
    let second = Arc::new(2);
    let r1 = collector.weak(&first, Some(&queue));
    let r2 = collector.weak(&second, Some(&queue));

    drop(second);
    collector.collect();
    drop(first);
    collector.collect();

    assert_eq!(queue.poll(), Some(r2));
    assert_eq!(queue.poll(), Some(r1));
}

#[test]
fn remove_with_timeout_waits_full_timeout() {
    let queue: ReclamationQueue<u32> = ReclamationQueue::new();
    let timeout = Duration::from_millis(200);

    let start = Instant::now();
    let removed = queue.remove(Some(timeout));
    let elapsed = start.elapsed();

    assert!(removed.is_none());
    assert!(elapsed >= timeout, "returned early after {:?}", elapsed);
    assert!(elapsed < timeout + Duration::from_millis(500), "overslept {:?}", elapsed);
}

#[test]
fn remove_without_timeout_blocks_until_enqueue() {
    let collector = Arc::new(sync_collector());
    let queue = ReclamationQueue::new();
    let target = Arc::new(String::from("SavePoint"));
    let reference = collector.weak(&target, Some(&queue));

    let background = Arc::clone(&collector);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        drop(target);
        background.collect();
    });

    let removed = queue.remove(None);
    handle.join().unwrap();
    assert_eq!(removed, Some(reference));
}

#[test]
fn remove_cancellable_times_out_with_none() {
    let queue: ReclamationQueue<u32> = ReclamationQueue::new();
    let token = CancelToken::new();
    let result = queue.remove_cancellable(Some(Duration::from_millis(20)), &token);
    assert!(matches!(result, Ok(None)));
}

#[test]
fn remove_cancellable_fails_fast_when_already_cancelled() {
    let queue: ReclamationQueue<u32> = ReclamationQueue::new();
    let token = CancelToken::new();
    token.cancel();

    let start = Instant::now();
    let result = queue.remove_cancellable(None, &token);
    assert!(matches!(result, Err(ReclaimError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn one_token_cancels_waits_on_several_queues() {
    let token = CancelToken::new();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let token = token.clone();
            thread::spawn(move || {
                let queue: ReclamationQueue<u32> = ReclamationQueue::new();
                queue.remove_cancellable(None, &token)
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(30));
    token.cancel();

    for handle in handles {
        let result = handle.join().unwrap();
        assert!(result.map_err(|e| e.is_cancelled()).err().unwrap());
    }
}

#[test]
fn cloned_handles_share_items() {
    let collector = sync_collector();
    let queue = ReclamationQueue::new();
    let other = queue.clone();
    let target = Arc::new(0u8);
    let reference = collector.weak(&target, Some(&queue));
    drop(target);
    collector.collect();

    assert_eq!(other.len(), 1);
    assert_eq!(other.poll(), Some(reference));
    assert!(queue.is_empty());
}
