//! Router configuration.

use edge_core::{ConfigError, LocaleCode, RouterSettings};
use http::StatusCode;

/// How the router falls back and which paths it leaves alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Locale used when a request carries no known locale.
    pub default_locale: Option<LocaleCode>,
    /// Header carrying the visitor's country code, set by the proxy or CDN.
    pub geo_header: Option<String>,
    /// Path prefixes forwarded without locale handling.
    pub bypass_prefixes: Vec<String>,
    /// Status code for locale redirects.
    pub redirect_status: StatusCode,
}

impl RouterConfig {
    /// Create a config with no default locale and the standard bypass prefixes.
    pub fn new() -> Self {
        Self {
            default_locale: None,
            geo_header: None,
            bypass_prefixes: RouterSettings::default().bypass_prefixes,
            redirect_status: StatusCode::TEMPORARY_REDIRECT,
        }
    }

    /// Build from the `[router]` section of the edge configuration.
    pub fn from_settings(settings: &RouterSettings) -> Result<Self, ConfigError> {
        let default_locale = match settings.default_locale.as_deref() {
            None => None,
            Some(raw) => Some(
                LocaleCode::parse(raw)
                    .ok_or_else(|| ConfigError::InvalidDefaultLocale(raw.to_string()))?,
            ),
        };

        Ok(Self {
            default_locale,
            geo_header: settings.geo_header.clone(),
            bypass_prefixes: settings.bypass_prefixes.clone(),
            redirect_status: StatusCode::TEMPORARY_REDIRECT,
        })
    }

    /// Set the default locale.
    pub fn with_default_locale(mut self, locale: LocaleCode) -> Self {
        self.default_locale = Some(locale);
        self
    }

    /// Set the geo country header.
    pub fn with_geo_header(mut self, header: impl Into<String>) -> Self {
        self.geo_header = Some(header.into());
        self
    }

    /// Replace the bypass prefixes.
    pub fn with_bypass_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.bypass_prefixes = prefixes;
        self
    }

    /// Set the redirect status code.
    pub fn with_redirect_status(mut self, status: StatusCode) -> Self {
        self.redirect_status = status;
        self
    }

    /// Check if a path is forwarded without locale handling.
    ///
    /// Matches a configured prefix on a segment boundary, or any path whose
    /// last segment has a file extension.
    pub fn is_bypassed(&self, path: &str) -> bool {
        let prefixed = self.bypass_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            !prefix.is_empty()
                && path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        });

        prefixed || has_file_extension(path)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn has_file_extension(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    last.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
}
