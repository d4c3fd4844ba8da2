//! Funnel counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single funnel
///
/// Shared behind an `Arc` so a driver's owner can read them while the
/// driver task runs.
#[derive(Debug, Default)]
pub struct FunnelMetrics {
    /// Current ingest buffer depth
    buffer_depth: AtomicUsize,
    /// Chunks accepted by ingest
    ingested_count: AtomicU64,
    /// Chunks handed to a bucket
    delivered_count: AtomicU64,
    /// Chunks put back at the head (valve rejection or failed write)
    requeued_count: AtomicU64,
    /// Shutoff notifications emitted
    shutoff_count: AtomicU64,
    /// Writes answered with backpressure
    backpressure_count: AtomicU64,
    /// Chunks evicted or refused by the capacity policy
    dropped_count: AtomicU64,
    /// Buckets attached
    attach_count: AtomicU64,
}

impl FunnelMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_depth(&self) -> usize {
        self.buffer_depth.load(Ordering::Relaxed)
    }

    pub fn set_buffer_depth(&self, depth: usize) {
        self.buffer_depth.store(depth, Ordering::Relaxed);
    }

    pub fn ingested_count(&self) -> u64 {
        self.ingested_count.load(Ordering::Relaxed)
    }

    pub fn inc_ingested_count(&self) {
        self.ingested_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count.load(Ordering::Relaxed)
    }

    pub fn inc_delivered_count(&self) {
        self.delivered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requeued_count(&self) -> u64 {
        self.requeued_count.load(Ordering::Relaxed)
    }

    pub fn inc_requeued_count(&self) {
        self.requeued_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn shutoff_count(&self) -> u64 {
        self.shutoff_count.load(Ordering::Relaxed)
    }

    pub fn inc_shutoff_count(&self) {
        self.shutoff_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn backpressure_count(&self) -> u64 {
        self.backpressure_count.load(Ordering::Relaxed)
    }

    pub fn inc_backpressure_count(&self) {
        self.backpressure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn inc_dropped_count(&self) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attach_count(&self) -> u64 {
        self.attach_count.load(Ordering::Relaxed)
    }

    pub fn inc_attach_count(&self) {
        self.attach_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            buffer_depth: self.buffer_depth(),
            ingested_count: self.ingested_count(),
            delivered_count: self.delivered_count(),
            requeued_count: self.requeued_count(),
            shutoff_count: self.shutoff_count(),
            backpressure_count: self.backpressure_count(),
            dropped_count: self.dropped_count(),
            attach_count: self.attach_count(),
        }
    }
}

/// Snapshot of funnel metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub buffer_depth: usize,
    pub ingested_count: u64,
    pub delivered_count: u64,
    pub requeued_count: u64,
    pub shutoff_count: u64,
    pub backpressure_count: u64,
    pub dropped_count: u64,
    pub attach_count: u64,
}
