//! Metrics registry for flashsafe
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only when the owning context is constructed

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one engine context
///
/// Uses Relaxed ordering; counters are observational only.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    pages_erased: AtomicU64,
    pages_written: AtomicU64,
    pages_read: AtomicU64,
    io_retries: AtomicU64,
    io_failures: AtomicU64,
    pairs_recovered: AtomicU64,
    pairs_corrupt: AtomicU64,
    formats: AtomicU64,
    blob_commits: AtomicU64,
    blob_aborts: AtomicU64,
    blob_bytes_committed: AtomicU64,
    log_appends: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub pages_erased: u64,
    pub pages_written: u64,
    pub pages_read: u64,
    pub io_retries: u64,
    pub io_failures: u64,
    pub pairs_recovered: u64,
    pub pairs_corrupt: u64,
    pub formats: u64,
    pub blob_commits: u64,
    pub blob_aborts: u64,
    pub blob_bytes_committed: u64,
    pub log_appends: u64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Media

    pub fn increment_pages_erased(&self) {
        self.pages_erased.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pages_written(&self) {
        self.pages_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pages_read(&self) {
        self.pages_read.fetch_add(1, Ordering::Relaxed);
    }

    /// One failed attempt that was followed by another
    pub fn increment_io_retries(&self) {
        self.io_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// An operation that exhausted its retry budget
    pub fn increment_io_failures(&self) {
        self.io_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Redundancy

    pub fn increment_pairs_recovered(&self) {
        self.pairs_recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pairs_corrupt(&self) {
        self.pairs_corrupt.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_formats(&self) {
        self.formats.fetch_add(1, Ordering::Relaxed);
    }

    // Engines

    pub fn record_blob_commit(&self, bytes: u64) {
        self.blob_commits.fetch_add(1, Ordering::Relaxed);
        self.blob_bytes_committed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_blob_aborts(&self) {
        self.blob_aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_log_appends(&self) {
        self.log_appends.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_erased: self.pages_erased.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            io_retries: self.io_retries.load(Ordering::Relaxed),
            io_failures: self.io_failures.load(Ordering::Relaxed),
            pairs_recovered: self.pairs_recovered.load(Ordering::Relaxed),
            pairs_corrupt: self.pairs_corrupt.load(Ordering::Relaxed),
            formats: self.formats.load(Ordering::Relaxed),
            blob_commits: self.blob_commits.load(Ordering::Relaxed),
            blob_aborts: self.blob_aborts.load(Ordering::Relaxed),
            blob_bytes_committed: self.blob_bytes_committed.load(Ordering::Relaxed),
            log_appends: self.log_appends.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_is_zeroed() {
        assert_eq!(MetricsRegistry::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_increment() {
        let metrics = MetricsRegistry::new();
        metrics.increment_pages_written();
        metrics.increment_pages_written();
        metrics.increment_io_retries();
        metrics.record_blob_commit(100);
        metrics.record_blob_commit(28);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pages_written, 2);
        assert_eq!(snapshot.io_retries, 1);
        assert_eq!(snapshot.blob_commits, 2);
        assert_eq!(snapshot.blob_bytes_committed, 128);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = MetricsRegistry::new();
        metrics.increment_pairs_recovered();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["pairs_recovered"], 1);
    }
}
