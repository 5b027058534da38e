//! Unit tests for ReferenceId

use core_types::ReferenceId;
use std::collections::HashSet;
use std::thread;

#[test]
fn test_ids_are_unique_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| (0..250).map(|_| ReferenceId::next()).collect::<Vec<_>>()))
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "duplicate id {}", id);
        }
    }
    assert_eq!(seen.len(), 1000);
}

#[test]
fn test_id_display_format() {
    let id = ReferenceId::next();
    assert_eq!(format!("{}", id), format!("ref#{}", id.as_u64()));
}
