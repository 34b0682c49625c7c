//! Static path enumeration against the backend.
//!
//! Enumeration is best-effort. Every failure (a page that keeps failing
//! after its retries, the overall timeout, pagination that never ends or
//! stops short of the reported count) is absorbed into an outcome with no
//! paths and [`RenderingMode::Dynamic`].
//! A partially enumerated content type is never reported as static.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use edge_core::{LocaleCode, StaticPathsConfig};
use edge_data::{BackendClient, Endpoint, FetchError, IdentifierPage, PageRequest, RetryPolicy};
use edge_observability::EdgeMetrics;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::content::ContentType;
use crate::path::{RenderingMode, StaticPath, StaticPathSet};
use crate::plan::BuildPlan;

/// Page and time bounds for enumerating one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationSettings {
    /// Upper bound for the whole content type, across all pages and retries.
    pub timeout: Duration,
    /// Items requested per page.
    pub page_size: u32,
    /// Retry policy for each page request.
    pub retry: RetryPolicy,
    /// Pages fetched before pagination is considered runaway.
    pub max_pages: u32,
}

impl EnumerationSettings {
    /// Build from the `[static_paths]` section of the edge configuration.
    pub fn from_config(config: &StaticPathsConfig) -> Self {
        Self::default()
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_page_size(config.page_size)
            .with_retry(RetryPolicy::new(config.max_retries))
    }

    /// Set the overall timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the page size. Zero is raised to one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the per-page retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the page limit.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

impl Default for EnumerationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            page_size: 100,
            retry: RetryPolicy::new(Endpoint::Collection.default_max_retries()),
            max_pages: 1000,
        }
    }
}

/// Why enumeration of a content type was given up on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnumerationError {
    #[error("page at offset {offset} failed after {attempts} attempt(s): {source}")]
    Fetch {
        offset: u64,
        attempts: u32,
        source: FetchError,
    },

    #[error("enumeration timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("pagination did not finish within {0} pages")]
    PageLimit(u32),

    #[error("pagination ended after {fetched} of {total} reported items")]
    Incomplete { fetched: u64, total: u64 },
}

/// Report of one content type that fell back to dynamic rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationDiagnostic {
    /// Content type name.
    pub content_type: String,
    /// Failure cause.
    pub cause: String,
    /// Time spent before giving up.
    pub elapsed_ms: u64,
}

impl fmt::Display for EnumerationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (after {}ms)",
            self.content_type, self.cause, self.elapsed_ms
        )
    }
}

/// Result of enumerating one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationOutcome {
    /// Content type name.
    pub content_type: String,
    /// Enumerated paths; always empty when `mode` is dynamic.
    pub paths: StaticPathSet,
    /// Rendering mode for this content type.
    pub mode: RenderingMode,
    /// Present exactly when enumeration failed.
    pub diagnostic: Option<EnumerationDiagnostic>,
}

impl EnumerationOutcome {
    /// Check if the content type can be pre-rendered.
    pub fn is_static(&self) -> bool {
        self.mode.is_static()
    }
}

#[derive(Debug, Clone)]
struct LocaleExpansion {
    param: String,
    locales: Vec<LocaleCode>,
}

/// Enumerates content identifiers into static paths at build time.
pub struct StaticPathEnumerator {
    backend: Arc<dyn BackendClient>,
    settings: EnumerationSettings,
    locales: Option<LocaleExpansion>,
    metrics: Arc<EdgeMetrics>,
}

impl StaticPathEnumerator {
    /// Create a new enumerator.
    pub fn new(backend: Arc<dyn BackendClient>, settings: EnumerationSettings) -> Self {
        Self {
            backend,
            settings,
            locales: None,
            metrics: Arc::new(EdgeMetrics::new()),
        }
    }

    /// Expand every identifier into one path per locale, under `param`.
    pub fn with_locales(mut self, param: impl Into<String>, locales: Vec<LocaleCode>) -> Self {
        self.locales = Some(LocaleExpansion {
            param: param.into(),
            locales,
        });
        self
    }

    /// Report into the given counters.
    pub fn with_metrics(mut self, metrics: Arc<EdgeMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The settings in use.
    pub fn settings(&self) -> &EnumerationSettings {
        &self.settings
    }

    /// Enumerate one content type. Never fails; see [`EnumerationOutcome`].
    pub async fn enumerate(&self, content_type: &ContentType) -> EnumerationOutcome {
        let started = Instant::now();

        let result =
            match tokio::time::timeout(self.settings.timeout, self.collect_identifiers(content_type))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(EnumerationError::Timeout(self.settings.timeout)),
            };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(identifiers) => {
                let paths = self.expand(content_type, identifiers);
                self.metrics.enumerations_succeeded.incr();
                tracing::info!(
                    content_type = %content_type.name,
                    paths = paths.len(),
                    elapsed_ms,
                    "static paths enumerated"
                );
                EnumerationOutcome {
                    content_type: content_type.name.clone(),
                    paths,
                    mode: RenderingMode::Static,
                    diagnostic: None,
                }
            }
            Err(err) => {
                self.metrics.enumerations_failed.incr();
                let diagnostic = EnumerationDiagnostic {
                    content_type: content_type.name.clone(),
                    cause: err.to_string(),
                    elapsed_ms,
                };
                tracing::warn!(
                    content_type = %diagnostic.content_type,
                    cause = %diagnostic.cause,
                    elapsed_ms,
                    "static path enumeration failed, rendering dynamically"
                );
                EnumerationOutcome {
                    content_type: content_type.name.clone(),
                    paths: StaticPathSet::new(),
                    mode: RenderingMode::Dynamic,
                    diagnostic: Some(diagnostic),
                }
            }
        }
    }

    /// Enumerate content types one after another into a build plan.
    pub async fn enumerate_all(&self, content_types: &[ContentType]) -> BuildPlan {
        let mut plan = BuildPlan::new();
        for content_type in content_types {
            plan.insert(self.enumerate(content_type).await);
        }
        plan
    }

    async fn collect_identifiers(
        &self,
        content_type: &ContentType,
    ) -> Result<Vec<String>, EnumerationError> {
        let limit = self.settings.page_size.max(1);
        let mut seen = HashSet::new();
        let mut identifiers = Vec::new();
        let mut offset = 0u64;

        for _ in 0..self.settings.max_pages {
            let page = self
                .fetch_page(content_type, PageRequest { offset, limit })
                .await?;

            for id in page.identifiers {
                if seen.insert(id.clone()) {
                    identifiers.push(id);
                }
            }

            offset += page.returned as u64;

            // With a reported count, a short page does not end pagination.
            match page.total {
                Some(total) if offset >= total => return Ok(identifiers),
                Some(total) if page.returned == 0 => {
                    return Err(EnumerationError::Incomplete {
                        fetched: offset,
                        total,
                    })
                }
                Some(_) => {}
                None if page.returned < limit as usize => return Ok(identifiers),
                None => {}
            }
        }

        Err(EnumerationError::PageLimit(self.settings.max_pages))
    }

    async fn fetch_page(
        &self,
        content_type: &ContentType,
        page: PageRequest,
    ) -> Result<IdentifierPage, EnumerationError> {
        let retry = &self.settings.retry;
        let mut attempt = 0;

        loop {
            match self
                .backend
                .list_identifiers(&content_type.endpoint, page)
                .await
            {
                Ok(result) => return Ok(result),
                Err(err) if retry.should_retry(&err, attempt) => {
                    let delay = retry.delay_for_attempt(attempt);
                    tracing::debug!(
                        content_type = %content_type.name,
                        offset = page.offset,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying page"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(EnumerationError::Fetch {
                        offset: page.offset,
                        attempts: attempt + 1,
                        source: err,
                    })
                }
            }
        }
    }

    fn expand(&self, content_type: &ContentType, identifiers: Vec<String>) -> StaticPathSet {
        match &self.locales {
            None => identifiers
                .into_iter()
                .map(|id| StaticPath::single(&content_type.param, id))
                .collect(),
            Some(expansion) => expansion
                .locales
                .iter()
                .flat_map(|locale| {
                    identifiers.iter().map(move |id| {
                        StaticPath::single(&expansion.param, locale.as_str())
                            .with(&content_type.param, id)
                    })
                })
                .collect(),
        }
    }
}

impl fmt::Debug for StaticPathEnumerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPathEnumerator")
            .field("settings", &self.settings)
            .field("locales", &self.locales)
            .finish_non_exhaustive()
    }
}
