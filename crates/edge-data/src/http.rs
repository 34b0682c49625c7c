//! HTTP implementation of the backend client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::client::{join_url, BackendClient, FetchError, PUBLISHABLE_KEY_HEADER};
use crate::endpoint::Endpoint;
use crate::records::{CollectionEndpoint, IdentifierPage, PageRequest, RegionList, RegionRecord};
use crate::timeout::TimeoutConfig;

/// HTTP backend client.
///
/// Per-call timeouts come from [`Endpoint`] defaults unless overridden.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    publishable_key: Option<String>,
    region_timeout: TimeoutConfig,
    collection_timeout: TimeoutConfig,
}

impl HttpBackend {
    /// Create a client for the given base address.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            publishable_key: None,
            region_timeout: TimeoutConfig::from_total(Endpoint::Regions.default_timeout()),
            collection_timeout: TimeoutConfig::from_total(
                Endpoint::Collection.default_timeout(),
            ),
        }
    }

    /// Send a publishable API key with every request.
    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    /// Override the per-call timeout for an endpoint.
    pub fn with_timeout(mut self, endpoint: Endpoint, timeout: TimeoutConfig) -> Self {
        match endpoint {
            Endpoint::Regions => self.region_timeout = timeout,
            Endpoint::Collection => self.collection_timeout = timeout,
        }
        self
    }

    /// Get the base address.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: TimeoutConfig,
    ) -> Result<T, FetchError> {
        let mut request = self.client.get(url).query(query).timeout(timeout.total);
        if let Some(key) = &self.publishable_key {
            request = request.header(PUBLISHABLE_KEY_HEADER, key);
        }

        let resp = request.send().await.map_err(|e| classify(url, e))?;

        let status = resp.status().as_u16();
        if status >= 400 {
            return Err(FetchError::Http {
                status,
                url: url.to_string(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| classify(url, e))?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Deserialization(e.to_string()))
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn list_regions(&self) -> Result<Vec<RegionRecord>, FetchError> {
        let url = join_url(&self.base_url, "/store/regions");
        let body: RegionList = self.get_json(&url, &[], self.region_timeout).await?;
        Ok(body.regions)
    }

    async fn list_identifiers(
        &self,
        endpoint: &CollectionEndpoint,
        page: PageRequest,
    ) -> Result<IdentifierPage, FetchError> {
        let url = join_url(&self.base_url, &endpoint.path);
        let query = [
            ("limit", page.limit.to_string()),
            ("offset", page.offset.to_string()),
            ("fields", endpoint.id_field.clone()),
        ];

        let body: serde_json::Value = self.get_json(&url, &query, self.collection_timeout).await?;
        endpoint.parse_page(&body).map_err(FetchError::Deserialization)
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(format!("{} ({})", url, e))
    } else if e.is_connect() {
        FetchError::Connection(format!("{} ({})", url, e))
    } else if let Some(status) = e.status() {
        FetchError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        }
    } else {
        FetchError::Request(e.to_string())
    }
}
