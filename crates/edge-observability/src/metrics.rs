//! Process-wide counters.
//!
//! Counters are per instance: every edge process keeps its own, matching the
//! per-instance region cache.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A single monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Increment by one.
    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counters for the region cache, router, and static path enumeration.
#[derive(Debug, Default)]
pub struct EdgeMetrics {
    /// Lookups answered from a fresh snapshot.
    pub cache_hits: Counter,
    /// Backend region fetches started.
    pub refreshes: Counter,
    /// Backend region fetches that failed.
    pub refresh_failures: Counter,
    /// Lookups answered from a stale snapshot after a failed refresh.
    pub stale_serves: Counter,
    /// Requests forwarded with a resolved locale.
    pub pass_throughs: Counter,
    /// Requests redirected to a locale-prefixed path.
    pub redirects: Counter,
    /// Requests answered with the unavailable response.
    pub unavailable: Counter,
    /// Requests forwarded without locale handling.
    pub bypassed: Counter,
    /// Content types enumerated successfully.
    pub enumerations_succeeded: Counter,
    /// Content types that fell back to dynamic rendering.
    pub enumerations_failed: Counter,
}

impl EdgeMetrics {
    /// Create a new set of counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a serializable snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.get(),
            refreshes: self.refreshes.get(),
            refresh_failures: self.refresh_failures.get(),
            stale_serves: self.stale_serves.get(),
            pass_throughs: self.pass_throughs.get(),
            redirects: self.redirects.get(),
            unavailable: self.unavailable.get(),
            bypassed: self.bypassed.get(),
            enumerations_succeeded: self.enumerations_succeeded.get(),
            enumerations_failed: self.enumerations_failed.get(),
        }
    }
}

/// Point-in-time copy of [`EdgeMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub refreshes: u64,
    pub refresh_failures: u64,
    pub stale_serves: u64,
    pub pass_throughs: u64,
    pub redirects: u64,
    pub unavailable: u64,
    pub bypassed: u64,
    pub enumerations_succeeded: u64,
    pub enumerations_failed: u64,
}

impl MetricsSnapshot {
    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = EdgeMetrics::new();
        metrics.refreshes.incr();
        metrics.refreshes.incr();
        metrics.redirects.incr();

        let snap = metrics.snapshot();
        assert_eq!(snap.refreshes, 2);
        assert_eq!(snap.redirects, 1);
        assert_eq!(snap.cache_hits, 0);
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = EdgeMetrics::new();
        metrics.unavailable.incr();

        let json: serde_json::Value = serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert_eq!(json["unavailable"], 1);
    }
}
