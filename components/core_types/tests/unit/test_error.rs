//! Unit tests for ReclaimError

use core_types::{ReclaimError, ReclaimResult};
use std::error::Error;

#[cfg(test)]
mod reclaim_error_tests {
    use super::*;

    #[test]
    fn test_cancelled_is_cancelled() {
        assert!(ReclaimError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_thread_spawn_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::WouldBlock, "resource busy");
        let err = ReclaimError::from(io);
        assert!(!err.is_cancelled());
        assert!(err.source().is_some());
        assert_eq!(
            err.to_string(),
            "failed to spawn collector thread: resource busy"
        );
    }

    #[test]
    fn test_result_alias_propagates() {
        fn wait() -> ReclaimResult<u32> {
            Err(ReclaimError::Cancelled)
        }

        fn caller() -> ReclaimResult<u32> {
            let value = wait()?;
            Ok(value + 1)
        }

        assert!(matches!(caller(), Err(ReclaimError::Cancelled)));
    }
}
