//! Cache Statistics Module
//!
//! Tracks lookup and fetch metrics for the request cache.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a valid entry
    pub hits: u64,
    /// Lookups that found nothing valid
    pub misses: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Fetcher invocations started by `dedupe`
    pub fetches: u64,
    /// `dedupe` calls that joined a fetch already in flight
    pub coalesced: u64,
    /// Fetches that settled with an error
    pub fetch_failures: u64,
    /// Current number of stored entries
    pub total_entries: usize,
    /// Current number of in-flight fetches
    pub pending_requests: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    // == Update Gauges ==
    /// Updates the entry and pending gauges.
    pub fn set_sizes(&mut self, entries: usize, pending: usize) {
        self.total_entries = entries;
        self.pending_requests = pending;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.fetches, 0);
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.pending_requests, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_fetch_counters() {
        let mut stats = CacheStats::new();
        stats.record_fetch();
        stats.record_fetch();
        stats.record_coalesced();
        stats.record_fetch_failure();
        stats.record_expirations(3);

        assert_eq!(stats.fetches, 2);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.expirations, 3);
    }

    #[test]
    fn test_set_sizes() {
        let mut stats = CacheStats::new();
        stats.set_sizes(42, 2);
        assert_eq!(stats.total_entries, 42);
        assert_eq!(stats.pending_requests, 2);
    }
}
