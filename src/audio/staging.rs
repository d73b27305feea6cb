//! Scoped staging of utterance bytes.
//!
//! An utterance is staged for as long as its [`StagedUtterance`] guard lives. The
//! guard releases its accounting in `Drop`, so every exit path of a decode
//! (success, error, timeout, panic unwinding, dropped future) frees it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct StagingCounters {
    utterances: AtomicUsize,
    bytes: AtomicUsize,
}

/// Process-wide view of the utterances currently staged for decoding.
#[derive(Debug, Clone, Default)]
pub struct StagingArea {
    counters: Arc<StagingCounters>,
}

impl StagingArea {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `bytes` until the returned guard is dropped.
    pub fn stage(&self, bytes: Vec<u8>) -> StagedUtterance {
        self.counters.utterances.fetch_add(1, Ordering::SeqCst);
        self.counters.bytes.fetch_add(bytes.len(), Ordering::SeqCst);

        StagedUtterance {
            bytes: Arc::from(bytes),
            area: self.clone(),
        }
    }

    /// Number of utterances currently staged.
    pub fn in_flight(&self) -> usize {
        self.counters.utterances.load(Ordering::SeqCst)
    }

    /// Total bytes currently staged.
    pub fn staged_bytes(&self) -> usize {
        self.counters.bytes.load(Ordering::SeqCst)
    }
}

/// Guard owning one staged utterance.
#[derive(Debug)]
pub struct StagedUtterance {
    bytes: Arc<[u8]>,
    area: StagingArea,
}

impl StagedUtterance {
    /// Shared handle to the staged bytes, for handing to a worker thread.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl Drop for StagedUtterance {
    fn drop(&mut self) {
        self.area.counters.utterances.fetch_sub(1, Ordering::SeqCst);
        self.area.counters.bytes.fetch_sub(self.bytes.len(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_release() {
        let area = StagingArea::new();
        {
            let first = area.stage(vec![0u8; 10]);
            let second = area.stage(vec![0u8; 5]);
            assert_eq!(area.in_flight(), 2);
            assert_eq!(area.staged_bytes(), 15);
            assert_eq!(first.len(), 10);
            drop(second);
            assert_eq!(area.in_flight(), 1);
            assert_eq!(area.staged_bytes(), 10);
        }
        assert_eq!(area.in_flight(), 0);
        assert_eq!(area.staged_bytes(), 0);
    }

    #[test]
    fn test_released_on_early_return() {
        fn failing_step(area: &StagingArea) -> Result<(), String> {
            let _staged = area.stage(vec![1, 2, 3]);
            Err("decode failed".to_string())
        }

        let area = StagingArea::new();
        assert!(failing_step(&area).is_err());
        assert_eq!(area.in_flight(), 0);
    }

    #[test]
    fn test_bytes_outlive_guard_without_leaking_accounting() {
        let area = StagingArea::new();
        let staged = area.stage(vec![7, 8]);
        let shared = staged.bytes();
        drop(staged);
        assert_eq!(&shared[..], &[7, 8]);
        assert_eq!(area.staged_bytes(), 0);
    }
}
