//! The per-request routing state machine.

use std::sync::Arc;

use edge_cache::{RegionResolver, ResolveError, ResolvedLocale};
use edge_core::{ConfigError, LocaleCode, RequestContext};
use edge_observability::EdgeMetrics;

use crate::config::RouterConfig;
use crate::decision::{RouteDecision, UnavailableReason};

enum Mode {
    Ready(RegionResolver),
    Misconfigured(ConfigError),
}

/// Intercepts every request and decides how locale routing applies to it.
pub struct EdgeRouter {
    mode: Mode,
    config: RouterConfig,
    metrics: Arc<EdgeMetrics>,
}

impl EdgeRouter {
    /// Create a router over a resolver, sharing the resolver's counters.
    pub fn new(resolver: RegionResolver, config: RouterConfig) -> Self {
        let metrics = Arc::clone(resolver.metrics());
        Self {
            mode: Mode::Ready(resolver),
            config,
            metrics,
        }
    }

    /// Create a router for a process whose configuration is unusable.
    ///
    /// Every locale-routed request gets the unavailable response; bypassed
    /// paths are still forwarded.
    pub fn misconfigured(error: ConfigError) -> Self {
        tracing::error!(error = %error, "edge router started without a usable configuration");
        Self {
            mode: Mode::Misconfigured(error),
            config: RouterConfig::new(),
            metrics: Arc::new(EdgeMetrics::new()),
        }
    }

    /// Report into the given counters.
    pub fn with_metrics(mut self, metrics: Arc<EdgeMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The router configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The counters this router reports into.
    pub fn metrics(&self) -> &Arc<EdgeMetrics> {
        &self.metrics
    }

    /// Decide what happens to one request.
    pub async fn route(&self, ctx: &RequestContext) -> RouteDecision {
        let decision = self.decide(ctx).await;
        self.record(ctx, &decision);
        decision
    }

    async fn decide(&self, ctx: &RequestContext) -> RouteDecision {
        if self.config.is_bypassed(&ctx.path) {
            return RouteDecision::Bypass;
        }

        let resolver = match &self.mode {
            Mode::Ready(resolver) => resolver,
            Mode::Misconfigured(error) => {
                return RouteDecision::unavailable(UnavailableReason::Misconfigured, error.to_string())
            }
        };

        let (candidate, rest) = ctx.first_segment();

        if let Some(candidate) = candidate {
            match resolver.resolve(candidate).await {
                Ok(resolved) if resolved.code.is_canonical_spelling(candidate) => {
                    return RouteDecision::PassThrough {
                        locale: resolved.code,
                        region: resolved.region,
                    };
                }
                Ok(resolved) => return self.redirect(&resolved.code, rest, ctx),
                Err(ResolveError::NotFound(_)) => {}
                Err(ResolveError::BackendUnavailable(cause)) => {
                    return RouteDecision::unavailable(UnavailableReason::BackendUnavailable, cause)
                }
            }
        }

        // A locale-shaped segment is replaced; anything else is kept and prefixed.
        let tail = match candidate {
            Some(segment) if LocaleCode::looks_like_locale(segment) => rest,
            Some(_) => ctx.path.as_str(),
            None => "",
        };

        self.fallback(resolver, ctx, tail).await
    }

    async fn fallback(
        &self,
        resolver: &RegionResolver,
        ctx: &RequestContext,
        tail: &str,
    ) -> RouteDecision {
        if let Some(country) = self.geo_country(ctx) {
            match resolver.resolve(country).await {
                Ok(resolved) => return self.redirect(&resolved.code, tail, ctx),
                Err(ResolveError::NotFound(_)) => {
                    tracing::debug!(country, "geo country is not served by any region");
                }
                Err(ResolveError::BackendUnavailable(cause)) => {
                    return RouteDecision::unavailable(UnavailableReason::BackendUnavailable, cause)
                }
            }
        }

        let Some(default) = &self.config.default_locale else {
            return RouteDecision::unavailable(
                UnavailableReason::NoDefaultLocale,
                "request has no known locale and no default locale is configured",
            );
        };

        match resolver.resolve(default.as_str()).await {
            Ok(ResolvedLocale { code, .. }) => self.redirect(&code, tail, ctx),
            Err(ResolveError::NotFound(code)) => RouteDecision::unavailable(
                UnavailableReason::DefaultLocaleUnknown,
                format!("default locale {code:?} is not served by any region"),
            ),
            Err(ResolveError::BackendUnavailable(cause)) => {
                RouteDecision::unavailable(UnavailableReason::BackendUnavailable, cause)
            }
        }
    }

    fn geo_country<'a>(&self, ctx: &'a RequestContext) -> Option<&'a str> {
        let from_header = self
            .config
            .geo_header
            .as_deref()
            .and_then(|name| ctx.header(name));

        from_header
            .or_else(|| ctx.geo.as_ref().and_then(|geo| geo.country.as_deref()))
            .filter(|country| !country.trim().is_empty())
    }

    fn redirect(&self, locale: &LocaleCode, tail: &str, ctx: &RequestContext) -> RouteDecision {
        RouteDecision::Redirect {
            location: format!("/{}{}{}", locale, tail, ctx.query_suffix()),
            status: self.config.redirect_status,
        }
    }

    fn record(&self, ctx: &RequestContext, decision: &RouteDecision) {
        match decision {
            RouteDecision::PassThrough { locale, region } => {
                self.metrics.pass_throughs.incr();
                tracing::debug!(
                    request_id = %ctx.request_id,
                    path = %ctx.path,
                    locale = %locale,
                    region = %region.id,
                    "pass through"
                );
            }
            RouteDecision::Redirect { location, status } => {
                self.metrics.redirects.incr();
                tracing::debug!(
                    request_id = %ctx.request_id,
                    path = %ctx.path,
                    location = %location,
                    status = status.as_u16(),
                    "redirect"
                );
            }
            RouteDecision::Bypass => {
                self.metrics.bypassed.incr();
            }
            RouteDecision::Unavailable { reason, detail } => {
                self.metrics.unavailable.incr();
                tracing::warn!(
                    request_id = %ctx.request_id,
                    path = %ctx.path,
                    reason = %reason,
                    detail = %detail,
                    "request cannot be routed"
                );
            }
        }
    }
}

impl std::fmt::Debug for EdgeRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match &self.mode {
            Mode::Ready(_) => "ready",
            Mode::Misconfigured(_) => "misconfigured",
        };
        f.debug_struct("EdgeRouter")
            .field("mode", &mode)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use edge_cache::RefreshPolicy;
    use edge_core::GeoInfo;
    use edge_data::{
        BackendClient, CollectionEndpoint, CountryRecord, FetchError, IdentifierPage, PageRequest,
        RegionRecord,
    };
    use http::StatusCode;

    use super::*;

    #[derive(Default)]
    struct FakeBackend {
        calls: AtomicUsize,
        down: AtomicBool,
    }

    #[async_trait]
    impl BackendClient for FakeBackend {
        async fn list_regions(&self) -> Result<Vec<RegionRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                return Err(FetchError::Connection("connection refused".to_string()));
            }
            Ok(vec![
                region("reg_na", &["us", "ca"]),
                region("reg_eu", &["en", "de", "pt-br"]),
            ])
        }

        async fn list_identifiers(
            &self,
            _endpoint: &CollectionEndpoint,
            _page: PageRequest,
        ) -> Result<IdentifierPage, FetchError> {
            Ok(IdentifierPage::default())
        }
    }

    fn region(id: &str, codes: &[&str]) -> RegionRecord {
        RegionRecord {
            id: id.to_string(),
            name: id.to_string(),
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

    fn router_with(backend: Arc<FakeBackend>, config: RouterConfig) -> EdgeRouter {
        let client: Arc<dyn BackendClient> = backend;
        let resolver = RegionResolver::new(
            client,
            RefreshPolicy::new(Duration::from_secs(3600))
                .with_fetch_timeout(Duration::from_millis(500)),
        );
        EdgeRouter::new(resolver, config)
    }

    fn default_us() -> RouterConfig {
        RouterConfig::new().with_default_locale(LocaleCode::parse("us").unwrap())
    }

    fn redirect_to(location: &str) -> RouteDecision {
        RouteDecision::Redirect {
            location: location.to_string(),
            status: StatusCode::TEMPORARY_REDIRECT,
        }
    }

    #[tokio::test]
    async fn test_canonical_locale_passes_through() {
        let router = router_with(Arc::default(), default_us());

        let decision = router.route(&RequestContext::new("/en/products/shirt")).await;
        match decision {
            RouteDecision::PassThrough { locale, region } => {
                assert_eq!(locale.as_str(), "en");
                assert_eq!(region.id, "reg_eu");
            }
            other => panic!("expected pass through, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_canonical_casing_redirects() {
        let router = router_with(Arc::default(), default_us());

        let decision = router.route(&RequestContext::new("/EN/products/shirt")).await;
        assert_eq!(decision, redirect_to("/en/products/shirt"));
    }

    #[tokio::test]
    async fn test_underscore_separator_redirects() {
        let router = router_with(Arc::default(), default_us());

        let decision = router.route(&RequestContext::new("/pt_BR/cart")).await;
        assert_eq!(decision, redirect_to("/pt-br/cart"));
    }

    #[tokio::test]
    async fn test_unknown_locale_redirects_to_default() {
        let router = router_with(Arc::default(), default_us());

        let decision = router.route(&RequestContext::new("/xx/products/shirt")).await;
        assert_eq!(decision, redirect_to("/us/products/shirt"));
    }

    #[tokio::test]
    async fn test_backend_down_with_empty_cache_is_unavailable() {
        let backend = Arc::new(FakeBackend::default());
        backend.down.store(true, Ordering::SeqCst);
        let router = router_with(backend, default_us());

        let decision = router.route(&RequestContext::new("/xx/products")).await;
        match &decision {
            RouteDecision::Unavailable { reason, .. } => {
                assert_eq!(*reason, UnavailableReason::BackendUnavailable);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }

        let response = decision.to_response().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_default_locale_unknown_is_unavailable() {
        let config = RouterConfig::new().with_default_locale(LocaleCode::parse("jp").unwrap());
        let router = router_with(Arc::default(), config);

        let decision = router.route(&RequestContext::new("/xx")).await;
        assert!(matches!(
            decision,
            RouteDecision::Unavailable {
                reason: UnavailableReason::DefaultLocaleUnknown,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_no_default_locale_is_unavailable() {
        let router = router_with(Arc::default(), RouterConfig::new());

        let decision = router.route(&RequestContext::new("/")).await;
        assert!(matches!(
            decision,
            RouteDecision::Unavailable {
                reason: UnavailableReason::NoDefaultLocale,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_root_and_plain_paths_are_prefixed() {
        let router = router_with(Arc::default(), default_us());

        let root = router.route(&RequestContext::new("/")).await;
        assert_eq!(root, redirect_to("/us"));

        let plain = router.route(&RequestContext::new("/products/shirt")).await;
        assert_eq!(plain, redirect_to("/us/products/shirt"));
    }

    #[tokio::test]
    async fn test_short_content_segment_is_kept() {
        let router = router_with(Arc::default(), default_us());

        let faq = router.route(&RequestContext::new("/faq")).await;
        assert_eq!(faq, redirect_to("/us/faq"));

        let new = router.route(&RequestContext::new("/new/arrivals")).await;
        assert_eq!(new, redirect_to("/us/new/arrivals"));
    }

    #[tokio::test]
    async fn test_query_string_is_preserved() {
        let router = router_with(Arc::default(), default_us());

        let decision = router.route(&RequestContext::new("/US/store?page=2&sort=price")).await;
        assert_eq!(decision, redirect_to("/us/store?page=2&sort=price"));
    }

    #[tokio::test]
    async fn test_geo_header_wins_over_default() {
        let config = default_us().with_geo_header("x-vercel-ip-country");
        let router = router_with(Arc::default(), config);

        let ctx = RequestContext::new("/products").with_header("X-Vercel-IP-Country", "DE");
        assert_eq!(router.route(&ctx).await, redirect_to("/de/products"));

        let unknown = RequestContext::new("/products").with_header("x-vercel-ip-country", "ZZ");
        assert_eq!(router.route(&unknown).await, redirect_to("/us/products"));
    }

    #[tokio::test]
    async fn test_geo_info_is_used_without_header() {
        let router = router_with(Arc::default(), default_us());

        let ctx = RequestContext::new("/").with_geo(GeoInfo {
            country: Some("ca".to_string()),
        });
        assert_eq!(router.route(&ctx).await, redirect_to("/ca"));
    }

    #[tokio::test]
    async fn test_assets_bypass_without_fetch() {
        let backend = Arc::new(FakeBackend::default());
        let router = router_with(backend.clone(), default_us());

        assert_eq!(
            router.route(&RequestContext::new("/_next/static/app.js")).await,
            RouteDecision::Bypass
        );
        assert_eq!(
            router.route(&RequestContext::new("/api/health")).await,
            RouteDecision::Bypass
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(router.metrics().snapshot().bypassed, 2);
    }

    #[tokio::test]
    async fn test_misconfigured_router_answers_unavailable() {
        let router = EdgeRouter::misconfigured(ConfigError::MissingBackendUrl);

        let decision = router.route(&RequestContext::new("/en")).await;
        assert!(matches!(
            decision,
            RouteDecision::Unavailable {
                reason: UnavailableReason::Misconfigured,
                ..
            }
        ));
        assert_eq!(
            router.route(&RequestContext::new("/favicon.ico")).await,
            RouteDecision::Bypass
        );
    }

    #[tokio::test]
    async fn test_decisions_are_counted() {
        let router = router_with(Arc::default(), default_us());

        router.route(&RequestContext::new("/en")).await;
        router.route(&RequestContext::new("/EN")).await;
        router.route(&RequestContext::new("/xx")).await;

        let snap = router.metrics().snapshot();
        assert_eq!(snap.pass_throughs, 1);
        assert_eq!(snap.redirects, 2);
        assert_eq!(snap.refreshes, 1);
    }
}
