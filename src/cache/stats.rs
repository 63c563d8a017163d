//! Cache Statistics Module
//!
//! Tracks how `get_or_fetch` calls were resolved.

use serde::Serialize;

// == Cache Stats ==
/// Counters for one coordinator (one tab).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Calls answered from a fresh stored entry
    pub hits: u64,
    /// Calls that found no fresh entry
    pub misses: u64,
    /// Fetch functions invoked by this tab
    pub fetches: u64,
    /// Fetch functions that returned an error
    pub fetch_failures: u64,
    /// Calls that found the lease held by another tab
    pub lease_waits: u64,
    /// Waits resolved by another tab's broadcast
    pub broadcast_hits: u64,
    /// Waits that ran out of time
    pub wait_timeouts: u64,
    /// Timed-out waits answered from a stale stored entry
    pub stale_fallbacks: u64,
    /// Stored values discarded because they could not be parsed
    pub corrupt_entries: u64,
    /// Explicit invalidations
    pub invalidations: u64,
}

impl CacheStats {
    // == Constructor ==
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

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn record_fetch_failure(&mut self) {
        self.fetch_failures += 1;
    }

    pub fn record_lease_wait(&mut self) {
        self.lease_waits += 1;
    }

    pub fn record_broadcast_hit(&mut self) {
        self.broadcast_hits += 1;
    }

    pub fn record_wait_timeout(&mut self) {
        self.wait_timeouts += 1;
    }

    pub fn record_stale_fallback(&mut self) {
        self.stale_fallbacks += 1;
    }

    pub fn record_corrupt_entry(&mut self) {
        self.corrupt_entries += 1;
    }

    pub fn record_invalidation(&mut self) {
        self.invalidations += 1;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        assert_eq!(CacheStats::new(), CacheStats::default());
        assert_eq!(CacheStats::new().fetches, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
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
    fn test_wait_counters() {
        let mut stats = CacheStats::new();
        stats.record_lease_wait();
        stats.record_lease_wait();
        stats.record_wait_timeout();
        stats.record_stale_fallback();

        assert_eq!(stats.lease_waits, 2);
        assert_eq!(stats.wait_timeouts, 1);
        assert_eq!(stats.stale_fallbacks, 1);
        assert_eq!(stats.broadcast_hits, 0);
    }

    #[test]
    fn test_serializes_all_counters() {
        let json = serde_json::to_value(CacheStats::new()).unwrap();
        for field in ["hits", "misses", "fetches", "wait_timeouts", "invalidations"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }
}
