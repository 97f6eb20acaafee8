//! Statistics cache metrics.
//!
//! Tracks how often reads were served from the store and how much
//! recomputation and invalidation the engine performed.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters owned by one engine instance.
#[derive(Debug, Default)]
pub struct StatsMetrics {
    /// Reads served from the counter store
    cache_hits: AtomicUsize,

    /// Reads that had to compute the snapshot
    cache_misses: AtomicUsize,

    /// Translation snapshots computed from strings
    leaf_computations: AtomicUsize,

    /// Parent snapshots computed from children
    parent_computations: AtomicUsize,

    /// Snapshots marked stale
    invalidations: AtomicUsize,
}

impl StatsMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_leaf_computation(&self) {
        self.leaf_computations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parent_computation(&self) {
        self.parent_computations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn leaf_computations(&self) -> usize {
        self.leaf_computations.load(Ordering::Relaxed)
    }

    pub fn parent_computations(&self) -> usize {
        self.parent_computations.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let total_reads = hits + misses;
        let cache_hit_rate = if total_reads > 0 {
            (hits as f64 / total_reads as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            leaf_computations: self.leaf_computations(),
            parent_computations: self.parent_computations(),
            invalidations: self.invalidations(),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub leaf_computations: usize,
    pub parent_computations: usize,
    pub invalidations: usize,
}
