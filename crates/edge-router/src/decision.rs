//! Routing decisions and their HTTP mapping.

use std::fmt;
use std::sync::Arc;

use edge_cache::Region;
use edge_core::LocaleCode;
use http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;

/// Header carrying the resolved region id to downstream handlers.
pub const REGION_HEADER: &str = "x-edge-region";
/// Header carrying the resolved locale code to downstream handlers.
pub const LOCALE_HEADER: &str = "x-edge-locale";
/// Seconds a client should wait before retrying an unavailable response.
pub const RETRY_AFTER_SECS: u32 = 30;

/// Why a request could not be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Backend unreachable and no region snapshot exists yet.
    BackendUnavailable,
    /// No known locale in the request and no default configured.
    NoDefaultLocale,
    /// The configured default locale is not served by any region.
    DefaultLocaleUnknown,
    /// Startup configuration was invalid.
    Misconfigured,
}

impl UnavailableReason {
    /// Get the reason as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendUnavailable => "backend_unavailable",
            Self::NoDefaultLocale => "no_default_locale",
            Self::DefaultLocaleUnknown => "default_locale_unknown",
            Self::Misconfigured => "misconfigured",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of routing one request. Every request ends in exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Forward with the resolved locale context.
    PassThrough {
        locale: LocaleCode,
        region: Arc<Region>,
    },
    /// Redirect to a canonical locale-prefixed path.
    Redirect {
        location: String,
        status: StatusCode,
    },
    /// Forward without locale handling (assets, API routes).
    Bypass,
    /// Answer with a visible "temporarily unavailable" response.
    Unavailable {
        reason: UnavailableReason,
        detail: String,
    },
}

impl RouteDecision {
    pub(crate) fn unavailable(reason: UnavailableReason, detail: impl Into<String>) -> Self {
        Self::Unavailable {
            reason,
            detail: detail.into(),
        }
    }

    /// Short name for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PassThrough { .. } => "pass_through",
            Self::Redirect { .. } => "redirect",
            Self::Bypass => "bypass",
            Self::Unavailable { .. } => "unavailable",
        }
    }

    /// Check if the request continues to normal handling.
    pub fn is_forwarded(&self) -> bool {
        matches!(self, Self::PassThrough { .. } | Self::Bypass)
    }

    /// The response to send instead of forwarding, if any.
    pub fn to_response(&self) -> Option<Response<String>> {
        match self {
            Self::PassThrough { .. } | Self::Bypass => None,
            Self::Redirect { location, status } => Some(redirect_response(location, *status)),
            Self::Unavailable { reason, detail } => Some(unavailable_response(*reason, detail)),
        }
    }

    /// Headers to add to a forwarded request.
    ///
    /// Empty for everything but pass-through.
    pub fn forward_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Self::PassThrough { locale, region } = self {
            if let Ok(value) = HeaderValue::from_str(&region.id) {
                headers.insert(HeaderName::from_static(REGION_HEADER), value);
            }
            if let Ok(value) = HeaderValue::from_str(locale.as_str()) {
                headers.insert(HeaderName::from_static(LOCALE_HEADER), value);
            }
        }

        headers
    }
}

fn redirect_response(location: &str, status: StatusCode) -> Response<String> {
    let Ok(value) = HeaderValue::from_str(location) else {
        let body = serde_json::json!({ "error": "invalid request path" }).to_string();
        return json_response(StatusCode::BAD_REQUEST, body);
    };

    let mut response = Response::new(String::new());
    *response.status_mut() = status;
    response.headers_mut().insert(LOCATION, value);
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn unavailable_response(reason: UnavailableReason, detail: &str) -> Response<String> {
    let body = serde_json::json!({
        "error": "service temporarily unavailable",
        "reason": reason,
        "detail": detail,
    })
    .to_string();

    let mut response = json_response(StatusCode::SERVICE_UNAVAILABLE, body);
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
    response
}

fn json_response(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Arc<Region> {
        Arc::new(Region {
            id: "reg_na".to_string(),
            name: "North America".to_string(),
            currency_code: "usd".to_string(),
            locales: vec![LocaleCode::parse("us").unwrap()],
            metadata: serde_json::Value::Null,
        })
    }

    #[test]
    fn test_redirect_response() {
        let decision = RouteDecision::Redirect {
            location: "/us/products?page=2".to_string(),
            status: StatusCode::TEMPORARY_REDIRECT,
        };

        let response = decision.to_response().unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[LOCATION], "/us/products?page=2");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
        assert!(!decision.is_forwarded());
    }

    #[test]
    fn test_unavailable_response() {
        let decision =
            RouteDecision::unavailable(UnavailableReason::NoDefaultLocale, "no default locale");

        let response = decision.to_response().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "30");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["reason"], "no_default_locale");
    }

    #[test]
    fn test_forwarded_decisions_have_no_response() {
        let pass = RouteDecision::PassThrough {
            locale: LocaleCode::parse("us").unwrap(),
            region: region(),
        };
        assert!(pass.to_response().is_none());
        assert!(RouteDecision::Bypass.to_response().is_none());
        assert!(pass.is_forwarded());
    }

    #[test]
    fn test_forward_headers() {
        let pass = RouteDecision::PassThrough {
            locale: LocaleCode::parse("us").unwrap(),
            region: region(),
        };

        let headers = pass.forward_headers();
        assert_eq!(headers[REGION_HEADER], "reg_na");
        assert_eq!(headers[LOCALE_HEADER], "us");
        assert!(RouteDecision::Bypass.forward_headers().is_empty());
    }

    #[test]
    fn test_invalid_location_is_bad_request() {
        let decision = RouteDecision::Redirect {
            location: "/us/\u{7f}".to_string(),
            status: StatusCode::TEMPORARY_REDIRECT,
        };

        let response = decision.to_response().unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
