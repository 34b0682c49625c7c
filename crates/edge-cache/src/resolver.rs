//! Locale to region resolution with single-flight refresh.
//!
//! The resolver holds one [`RegionSnapshot`] at a time. Readers load it
//! without locking. When it is missing, expired, or invalidated, the first
//! caller starts a refresh and every caller that arrives before the refresh
//! completes awaits the same future, so the backend sees one fetch per
//! expiry no matter how many requests are waiting.
//!
//! A failed refresh never clears a previously populated snapshot: callers
//! keep getting the old regions (marked [`CacheStatus::Stale`]) and the next
//! call retries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use edge_core::LocaleCode;
use edge_data::BackendClient;
use edge_observability::EdgeMetrics;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

use crate::policy::RefreshPolicy;
use crate::region::{Region, RegionSnapshot};

/// Resolution errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The code is well-formed but no region serves it, or it is not a
    /// locale code at all.
    #[error("locale {0:?} is not served by any region")]
    NotFound(String),

    /// The backend could not be reached and no snapshot exists yet.
    #[error("region backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl ResolveError {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Where a resolution's snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from a fresh snapshot.
    Hit,
    /// Served from a snapshot fetched for this call.
    Refreshed,
    /// Refresh failed; served from the previous snapshot.
    Stale,
}

impl CacheStatus {
    /// Get the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Refreshed => "refreshed",
            Self::Stale => "stale",
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedLocale {
    /// Normalized locale code.
    pub code: LocaleCode,
    /// The region serving it. Shared with every other caller holding the
    /// same snapshot.
    pub region: Arc<Region>,
    /// Snapshot provenance.
    pub status: CacheStatus,
}

type RefreshResult = Result<Arc<RegionSnapshot>, ResolveError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshResult>>;

enum Flight {
    Fresh(Arc<RegionSnapshot>),
    Pending(SharedRefresh),
}

/// Maps locale codes to regions, backed by a TTL snapshot of the backend's
/// region list.
///
/// Cheap to clone; clones share the snapshot and the in-flight refresh.
#[derive(Clone)]
pub struct RegionResolver {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn BackendClient>,
    policy: RefreshPolicy,
    snapshot: ArcSwapOption<RegionSnapshot>,
    in_flight: Mutex<Option<SharedRefresh>>,
    invalidated: AtomicBool,
    metrics: Arc<EdgeMetrics>,
}

impl RegionResolver {
    /// Create a resolver with its own counters.
    pub fn new(backend: Arc<dyn BackendClient>, policy: RefreshPolicy) -> Self {
        Self::with_metrics(backend, policy, Arc::new(EdgeMetrics::new()))
    }

    /// Create a resolver reporting into shared counters.
    pub fn with_metrics(
        backend: Arc<dyn BackendClient>,
        policy: RefreshPolicy,
        metrics: Arc<EdgeMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                policy,
                snapshot: ArcSwapOption::empty(),
                in_flight: Mutex::new(None),
                invalidated: AtomicBool::new(false),
                metrics,
            }),
        }
    }

    /// The refresh policy in use.
    pub fn policy(&self) -> &RefreshPolicy {
        &self.inner.policy
    }

    /// The counters this resolver reports into.
    pub fn metrics(&self) -> &Arc<EdgeMetrics> {
        &self.inner.metrics
    }

    /// Resolve a locale code to its region.
    ///
    /// Matching is case-insensitive. A code that is not in a fresh snapshot
    /// is not found; misses do not trigger a refresh.
    pub async fn resolve(&self, code: &str) -> Result<ResolvedLocale, ResolveError> {
        let Some(key) = LocaleCode::parse(code) else {
            return Err(ResolveError::NotFound(code.to_string()));
        };

        let (snapshot, status) = self.current().await?;

        match snapshot.get(&key) {
            Some(region) => Ok(ResolvedLocale {
                region: Arc::clone(region),
                code: key,
                status,
            }),
            None => Err(ResolveError::NotFound(key.to_string())),
        }
    }

    /// All regions in the current snapshot, refreshing first if needed.
    pub async fn regions(&self) -> Result<Vec<Arc<Region>>, ResolveError> {
        let (snapshot, _) = self.current().await?;
        Ok(snapshot.regions().to_vec())
    }

    /// Every routable locale code, refreshing first if needed.
    pub async fn known_locales(&self) -> Result<Vec<LocaleCode>, ResolveError> {
        let (snapshot, _) = self.current().await?;
        Ok(snapshot.locales())
    }

    /// The current snapshot, if one has ever been fetched. Never refreshes.
    pub fn snapshot(&self) -> Option<Arc<RegionSnapshot>> {
        self.inner.snapshot.load_full()
    }

    /// Force the next call to refresh.
    ///
    /// The current snapshot keeps serving as a stale fallback until the
    /// refresh succeeds.
    pub fn invalidate(&self) {
        self.inner.invalidated.store(true, Ordering::Release);
    }

    async fn current(&self) -> Result<(Arc<RegionSnapshot>, CacheStatus), ResolveError> {
        if let Some(snapshot) = self.inner.fresh_snapshot() {
            self.inner.metrics.cache_hits.incr();
            return Ok((snapshot, CacheStatus::Hit));
        }

        let flight = match self.join_flight() {
            Flight::Fresh(snapshot) => {
                self.inner.metrics.cache_hits.incr();
                return Ok((snapshot, CacheStatus::Hit));
            }
            Flight::Pending(flight) => flight,
        };

        match flight.await {
            Ok(snapshot) => Ok((snapshot, CacheStatus::Refreshed)),
            Err(err) => match self.inner.snapshot.load_full() {
                Some(stale) => {
                    self.inner.metrics.stale_serves.incr();
                    tracing::debug!(
                        age_secs = stale.age(Instant::now()).as_secs(),
                        "serving stale region snapshot"
                    );
                    Ok((stale, CacheStatus::Stale))
                }
                None => Err(err),
            },
        }
    }

    /// Join the in-flight refresh or start one.
    ///
    /// Freshness is checked again under the lock: a refresh that completed
    /// between the caller's first check and taking the lock has already
    /// stored its snapshot. The refresh runs as its own task, so it finishes
    /// even when every waiter is dropped. Must be called within a tokio
    /// runtime.
    fn join_flight(&self) -> Flight {
        let mut slot = self.inner.in_flight.lock();

        // A completed flight left in the slot belongs to a task that panicked.
        if let Some(flight) = slot.as_ref().filter(|flight| flight.peek().is_none()) {
            return Flight::Pending(flight.clone());
        }

        if let Some(snapshot) = self.inner.fresh_snapshot() {
            return Flight::Fresh(snapshot);
        }

        self.inner.invalidated.store(false, Ordering::Release);

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.refresh().await });
        let flight = task
            .map(|joined| {
                joined.unwrap_or_else(|err| {
                    Err(ResolveError::BackendUnavailable(format!(
                        "region refresh task failed: {err}"
                    )))
                })
            })
            .boxed()
            .shared();

        *slot = Some(flight.clone());
        Flight::Pending(flight)
    }
}

impl Inner {
    fn fresh_snapshot(&self) -> Option<Arc<RegionSnapshot>> {
        if self.invalidated.load(Ordering::Acquire) {
            return None;
        }

        self.snapshot
            .load_full()
            .filter(|snapshot| !snapshot.is_expired(self.policy.ttl, Instant::now()))
    }

    async fn refresh(&self) -> RefreshResult {
        self.metrics.refreshes.incr();
        let started = Instant::now();

        let result =
            match tokio::time::timeout(self.policy.fetch_timeout, self.backend.list_regions())
                .await
            {
                Ok(Ok(records)) => Ok(Arc::new(RegionSnapshot::from_records(
                    records,
                    Instant::now(),
                ))),
                Ok(Err(err)) => Err(ResolveError::BackendUnavailable(err.to_string())),
                Err(_) => Err(ResolveError::BackendUnavailable(format!(
                    "region fetch timed out after {}ms",
                    self.policy.fetch_timeout.as_millis()
                ))),
            };

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(snapshot) => {
                self.snapshot.store(Some(Arc::clone(snapshot)));
                tracing::info!(
                    regions = snapshot.regions().len(),
                    locales = snapshot.len(),
                    elapsed_ms,
                    "region snapshot refreshed"
                );
            }
            Err(err) => {
                self.metrics.refresh_failures.incr();
                // Keep forcing refreshes until one succeeds.
                self.invalidated.store(true, Ordering::Release);
                tracing::warn!(
                    error = %err,
                    elapsed_ms,
                    has_stale = self.snapshot.load().is_some(),
                    "region refresh failed"
                );
            }
        }

        *self.in_flight.lock() = None;
        result
    }
}

impl std::fmt::Debug for RegionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionResolver")
            .field("policy", &self.inner.policy)
            .field("locales", &self.snapshot().map(|s| s.len()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use edge_data::{
        CollectionEndpoint, CountryRecord, FetchError, IdentifierPage, PageRequest, RegionRecord,
    };

    use super::*;

    struct FakeBackend {
        calls: AtomicUsize,
        failing: AtomicBool,
        delay: Duration,
        regions: Mutex<Vec<RegionRecord>>,
    }

    impl FakeBackend {
        fn new(regions: Vec<RegionRecord>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                delay: Duration::ZERO,
                regions: Mutex::new(regions),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl BackendClient for FakeBackend {
        async fn list_regions(&self) -> Result<Vec<RegionRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Connection("connection refused".to_string()));
            }
            Ok(self.regions.lock().clone())
        }

        async fn list_identifiers(
            &self,
            _endpoint: &CollectionEndpoint,
            _page: PageRequest,
        ) -> Result<IdentifierPage, FetchError> {
            Ok(IdentifierPage::new(Vec::new(), Some(0)))
        }
    }

    fn record(id: &str, codes: &[&str]) -> RegionRecord {
        RegionRecord {
            id: id.to_string(),
            name: id.to_uppercase(),
            currency_code: "usd".to_string(),
            countries: codes
                .iter()
                .map(|c| CountryRecord {
                    iso_2: c.to_string(),
                    display_name: None,
                })
                .collect(),
            metadata: None,
        }
    }

    fn standard_regions() -> Vec<RegionRecord> {
        vec![record("reg_na", &["us", "ca"]), record("reg_eu", &["de", "fr", "en"])]
    }

    fn resolver(backend: &Arc<FakeBackend>) -> RegionResolver {
        let client: Arc<dyn BackendClient> = backend.clone();
        RegionResolver::new(
            client,
            RefreshPolicy::new(Duration::from_secs(3600))
                .with_fetch_timeout(Duration::from_millis(500)),
        )
    }

    #[tokio::test]
    async fn test_first_resolve_populates_cache() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);
        assert!(resolver.snapshot().is_none());

        let first = resolver.resolve("us").await.unwrap();
        assert_eq!(first.region.id, "reg_na");
        assert_eq!(first.status, CacheStatus::Refreshed);

        let second = resolver.resolve("ca").await.unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_region_identity_is_stable() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        let a = resolver.resolve("de").await.unwrap();
        let b = resolver.resolve("de").await.unwrap();
        let c = resolver.resolve("fr").await.unwrap();

        assert!(Arc::ptr_eq(&a.region, &b.region));
        assert!(Arc::ptr_eq(&a.region, &c.region));
    }

    #[tokio::test]
    async fn test_resolve_is_case_insensitive() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        let resolved = resolver.resolve("US").await.unwrap();
        assert_eq!(resolved.code.as_str(), "us");
        assert_eq!(resolved.region.id, "reg_na");
    }

    #[tokio::test]
    async fn test_unknown_code_does_not_refetch() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);
        resolver.resolve("us").await.unwrap();

        let err = resolver.resolve("zz").await.unwrap_err();
        assert_eq!(err, ResolveError::NotFound("zz".to_string()));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_code_is_not_found_without_fetch() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        let err = resolver.resolve("not a locale").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_fetch() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_millis(50)));
        let resolver = resolver(&backend);

        let results =
            futures::future::join_all((0..16).map(|_| resolver.resolve("us"))).await;

        assert_eq!(backend.calls(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            let resolved = result.as_ref().unwrap();
            assert!(Arc::ptr_eq(&resolved.region, &first.region));
        }
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_result() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_millis(50)));
        backend.set_failing(true);
        let resolver = resolver(&backend);

        let results =
            futures::future::join_all((0..8).map(|_| resolver.resolve("us"))).await;

        assert_eq!(backend.calls(), 1);
        let first = results[0].clone().unwrap_err();
        assert!(matches!(first, ResolveError::BackendUnavailable(_)));
        for result in results {
            assert_eq!(result.unwrap_err(), first);
        }
    }

    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_refresh() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_millis(50)));
        let resolver = resolver(&backend);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(5), resolver.resolve("us")).await;
        assert!(abandoned.is_err());
        assert_eq!(backend.calls(), 1);

        let resolved = resolver.resolve("us").await.unwrap();
        assert_eq!(resolved.region.id, "reg_na");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_refresh_completes_without_waiters() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_millis(20)));
        let resolver = resolver(&backend);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(1), resolver.resolve("us")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(resolver.snapshot().is_some());
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolves_on_expired_snapshot_share_one_fetch() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_millis(50)));
        let resolver = resolver(&backend);
        let before = resolver.resolve("us").await.unwrap();

        tokio::time::advance(Duration::from_secs(3601)).await;
        let results =
            futures::future::join_all((0..8).map(|_| resolver.resolve("us"))).await;

        assert_eq!(backend.calls(), 2);
        let first = results[0].as_ref().unwrap();
        assert!(!Arc::ptr_eq(&first.region, &before.region));
        for result in &results {
            let resolved = result.as_ref().unwrap();
            assert_eq!(resolved.status, CacheStatus::Refreshed);
            assert!(Arc::ptr_eq(&resolved.region, &first.region));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolves_on_expired_snapshot_share_stale_result() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_millis(50)));
        let resolver = resolver(&backend);
        let before = resolver.resolve("us").await.unwrap();

        tokio::time::advance(Duration::from_secs(3601)).await;
        backend.set_failing(true);
        let results =
            futures::future::join_all((0..8).map(|_| resolver.resolve("us"))).await;

        assert_eq!(backend.calls(), 2);
        for result in &results {
            let resolved = result.as_ref().unwrap();
            assert_eq!(resolved.status, CacheStatus::Stale);
            assert!(Arc::ptr_eq(&resolved.region, &before.region));
        }
        assert_eq!(resolver.metrics().snapshot().refresh_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_snapshot_is_refreshed() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        let before = resolver.resolve("us").await.unwrap();

        tokio::time::advance(Duration::from_secs(3599)).await;
        let hit = resolver.resolve("us").await.unwrap();
        assert_eq!(hit.status, CacheStatus::Hit);
        assert_eq!(backend.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let after = resolver.resolve("us").await.unwrap();
        assert_eq!(after.status, CacheStatus::Refreshed);
        assert_eq!(backend.calls(), 2);
        assert!(!Arc::ptr_eq(&before.region, &after.region));
        assert_eq!(*before.region, *after.region);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_snapshot() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        let before = resolver.resolve("us").await.unwrap();
        let refreshed_at = resolver.snapshot().unwrap().refreshed_at();

        backend.set_failing(true);
        tokio::time::advance(Duration::from_secs(3601)).await;

        let stale = resolver.resolve("us").await.unwrap();
        assert_eq!(stale.status, CacheStatus::Stale);
        assert!(Arc::ptr_eq(&before.region, &stale.region));
        assert_eq!(resolver.snapshot().unwrap().refreshed_at(), refreshed_at);
        assert_eq!(backend.calls(), 2);

        // Next call retries.
        resolver.resolve("us").await.unwrap();
        assert_eq!(backend.calls(), 3);

        backend.set_failing(false);
        let recovered = resolver.resolve("us").await.unwrap();
        assert_eq!(recovered.status, CacheStatus::Refreshed);
        assert_eq!(backend.calls(), 4);
        assert_eq!(resolver.metrics().snapshot().stale_serves, 2);
    }

    #[tokio::test]
    async fn test_empty_cache_failure_then_recovery() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        backend.set_failing(true);
        let resolver = resolver(&backend);

        let err = resolver.resolve("us").await.unwrap_err();
        assert!(matches!(err, ResolveError::BackendUnavailable(_)));
        assert!(resolver.snapshot().is_none());

        backend.set_failing(false);
        let resolved = resolver.resolve("us").await.unwrap();
        assert_eq!(resolved.region.id, "reg_na");
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let backend =
            Arc::new(FakeBackend::new(standard_regions()).with_delay(Duration::from_secs(10)));
        let resolver = resolver(&backend);

        let err = resolver.resolve("us").await.unwrap_err();
        match err {
            ResolveError::BackendUnavailable(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected BackendUnavailable, got {other:?}"),
        }
        assert_eq!(backend.calls(), 1);
        assert_eq!(resolver.metrics().snapshot().refresh_failures, 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);
        resolver.resolve("us").await.unwrap();

        backend.regions.lock().push(record("reg_apac", &["jp"]));
        assert!(resolver.resolve("jp").await.unwrap_err().is_not_found());

        resolver.invalidate();
        let resolved = resolver.resolve("jp").await.unwrap();
        assert_eq!(resolved.region.id, "reg_apac");
        assert_eq!(resolved.status, CacheStatus::Refreshed);
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_known_locales_and_regions() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        let locales: Vec<String> = resolver
            .known_locales()
            .await
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(locales, vec!["us", "ca", "de", "fr", "en"]);

        let regions = resolver.regions().await.unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_metrics_count_hits_and_refreshes() {
        let backend = Arc::new(FakeBackend::new(standard_regions()));
        let resolver = resolver(&backend);

        resolver.resolve("us").await.unwrap();
        resolver.resolve("us").await.unwrap();
        resolver.resolve("de").await.unwrap();

        let snap = resolver.metrics().snapshot();
        assert_eq!(snap.refreshes, 1);
        assert_eq!(snap.cache_hits, 2);
    }
}
