//! Region cache refresh policy.

use std::time::Duration;

use edge_core::EdgeConfig;
use edge_data::Endpoint;
use serde::{Deserialize, Serialize};

/// Default time a region snapshot stays fresh.
pub const DEFAULT_REGION_TTL: Duration = Duration::from_secs(3600);

/// When the region snapshot is considered stale and how long a refresh may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPolicy {
    /// Snapshot freshness window.
    pub ttl: Duration,
    /// Upper bound on one backend region fetch.
    pub fetch_timeout: Duration,
}

impl RefreshPolicy {
    /// Create a policy with the given TTL and the default fetch timeout.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            fetch_timeout: Endpoint::Regions.default_timeout(),
        }
    }

    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Build from the edge configuration.
    pub fn from_config(config: &EdgeConfig) -> Self {
        Self::new(config.cache_ttl()).with_fetch_timeout(config.region_timeout())
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_TTL)
    }
}
