//! Backend data service client.

use async_trait::async_trait;

use crate::records::{CollectionEndpoint, IdentifierPage, PageRequest, RegionRecord};

/// Error type for fetch operations.
///
/// Callers treat every variant as "fetch failed"; the split exists for
/// diagnostics and retry decisions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Request error: {0}")]
    Request(String),
}

/// Header carrying the storefront's publishable API key.
pub const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// The two backend queries the edge layer depends on.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// List every region with the locale codes it covers.
    async fn list_regions(&self) -> Result<Vec<RegionRecord>, FetchError>;

    /// List one page of identifiers for a collection.
    async fn list_identifiers(
        &self,
        endpoint: &CollectionEndpoint,
        page: PageRequest,
    ) -> Result<IdentifierPage, FetchError>;
}

/// Join a base address and a path with exactly one slash between them.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
