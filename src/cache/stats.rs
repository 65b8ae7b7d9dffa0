//! Cache Statistics Module
//!
//! Tracks cache read outcomes, producer invocations and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served from a fresh cached value
    pub hits: u64,
    /// Reads served from a stale cached value
    pub stale_hits: u64,
    /// Reads that had to wait for a first fetch (new or already in flight)
    pub misses: u64,
    /// First-fetch producer invocations
    pub fetches: u64,
    /// Background revalidations started
    pub revalidations: u64,
    /// Background revalidations that failed
    pub revalidation_failures: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate, stale reads counting as hits.
    ///
    /// Returns 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.stale_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_stale_hit(&mut self) {
        self.stale_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_revalidation(&mut self) {
        self.revalidations += 1;
    }

    pub fn record_revalidation_failure(&mut self) {
        self.revalidation_failures += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
