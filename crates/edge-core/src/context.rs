//! Request context seen by the edge router.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);

        Self(format!("{:x}-{:x}", nanos, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP headers, keyed by lowercase name.
pub type Headers = HashMap<String, String>;

/// Geographic information from the edge location.
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    /// ISO country code (e.g., "US").
    pub country: Option<String>,
}

/// Request context passed to the edge router.
///
/// Holds the original path and raw query string as delivered by the reverse
/// proxy so a redirect can reproduce them exactly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// Request path, always starting with `/`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// HTTP headers.
    pub headers: Headers,
    /// Geographic information.
    pub geo: Option<GeoInfo>,
}

impl RequestContext {
    /// Create a context from a request target such as `/en/products?page=2`.
    pub fn new(target: &str) -> Self {
        let (path, query) = match target.parse::<http::Uri>() {
            Ok(uri) => (uri.path().to_string(), uri.query().map(str::to_string)),
            Err(_) => match target.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (target.to_string(), None),
            },
        };

        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        Self {
            request_id: RequestId::generate(),
            path,
            query: query.filter(|q| !q.is_empty()),
            headers: HashMap::new(),
            geo: None,
        }
    }

    /// Build a context from an `http::Request`.
    pub fn from_http<B>(req: &http::Request<B>) -> Self {
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut ctx = Self::new(target);

        for (name, value) in req.headers() {
            if let Ok(value) = value.to_str() {
                ctx.headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        if let Some(id) = ctx.header("x-request-id") {
            ctx.request_id = RequestId::from_string(id);
        }

        ctx
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Attach geo information.
    pub fn with_geo(mut self, geo: GeoInfo) -> Self {
        self.geo = Some(geo);
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Split the path into its first segment and the remainder.
    ///
    /// `/en/products/shirt` gives `(Some("en"), "/products/shirt")`;
    /// `/` gives `(None, "")`.
    pub fn first_segment(&self) -> (Option<&str>, &str) {
        let trimmed = self.path.trim_start_matches('/');
        if trimmed.is_empty() {
            return (None, "");
        }

        match trimmed.find('/') {
            Some(idx) => (Some(&trimmed[..idx]), &trimmed[idx..]),
            None => (Some(trimmed), ""),
        }
    }

    /// The query string with its leading `?`, or an empty string.
    pub fn query_suffix(&self) -> String {
        match &self.query {
            Some(q) => format!("?{}", q),
            None => String::new(),
        }
    }
}
