//! Backend endpoint categories and their fetch defaults.

use std::time::Duration;

/// Backend calls made by the edge layer.
///
/// Each endpoint carries a default timeout and retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Region list, fetched on cache refresh at request time.
    Regions,
    /// Collection identifiers, fetched page by page at build time.
    Collection,
}

impl Endpoint {
    /// Get the default timeout for a single call.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Regions => Duration::from_secs(3),
            Self::Collection => Duration::from_secs(10),
        }
    }

    /// Get the default max retries for this endpoint.
    pub fn default_max_retries(&self) -> u32 {
        match self {
            // A failed refresh falls back to the stale snapshot; the next
            // request retries.
            Self::Regions => 0,
            Self::Collection => 1,
        }
    }

    /// Get the name of this endpoint.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Regions => "regions",
            Self::Collection => "collection",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
