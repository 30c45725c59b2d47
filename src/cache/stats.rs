//! Cache Statistics Module
//!
//! Tracks hits, misses, evictions and admission outcomes.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Requests answered from the cache
    pub hits: u64,
    /// Requests that went (or tried to go) to an origin
    pub misses: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Responses inserted into the cache
    pub admissions: u64,
    /// Responses not inserted because eviction could not make room
    pub skipped_admissions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current number of payload bytes in the cache
    pub total_size: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Increments the admission counter.
    pub fn record_admission(&mut self) {
        self.admissions += 1;
    }

    /// Increments the counter of responses that found no room.
    pub fn record_skipped_admission(&mut self) {
        self.skipped_admissions += 1;
    }
}
