//! Edge configuration surface.
//!
//! One required value (the backend base address) and a handful of optional
//! ones. Missing or malformed settings are reported by [`EdgeConfig::validate`]
//! at startup instead of surfacing on the first request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::locale::LocaleCode;

/// Environment variable overriding `backend.base_url`.
pub const ENV_BACKEND_URL: &str = "EDGE_BACKEND_URL";
/// Environment variable overriding `backend.publishable_key`.
pub const ENV_PUBLISHABLE_KEY: &str = "EDGE_PUBLISHABLE_KEY";
/// Environment variable overriding `router.default_locale`.
pub const ENV_DEFAULT_LOCALE: &str = "EDGE_DEFAULT_LOCALE";
/// Environment variable overriding `regions.cache_ttl_secs`.
pub const ENV_CACHE_TTL_SECS: &str = "EDGE_CACHE_TTL_SECS";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("backend base address is not configured (set backend.base_url or EDGE_BACKEND_URL)")]
    MissingBackendUrl,

    #[error("invalid backend base address {0:?}: expected an http:// or https:// URL")]
    InvalidBackendUrl(String),

    #[error("invalid default locale {0:?}")]
    InvalidDefaultLocale(String),

    #[error("region cache TTL must be greater than zero")]
    ZeroCacheTtl,

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("content type {0:?} is declared more than once")]
    DuplicateContentType(String),

    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Top-level edge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Backend data service settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Region cache settings.
    #[serde(default)]
    pub regions: RegionCacheConfig,

    /// Router settings.
    #[serde(default)]
    pub router: RouterSettings,

    /// Build-time static path settings.
    #[serde(default)]
    pub static_paths: StaticPathsConfig,
}

/// Backend data service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base address of the backend, e.g. `http://backend:9000`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Publishable API key sent with every backend request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,

    /// Timeout for the region list fetch, in milliseconds.
    #[serde(default = "default_region_timeout_ms")]
    pub region_timeout_ms: u64,
}

fn default_region_timeout_ms() -> u64 {
    3_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            publishable_key: None,
            region_timeout_ms: default_region_timeout_ms(),
        }
    }
}

/// Region cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionCacheConfig {
    /// How long a fetched region map stays fresh.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    3_600
}

impl Default for RegionCacheConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Router settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
    /// Locale used when a request carries no known locale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,

    /// Header carrying the visitor's country, set by the proxy or CDN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_header: Option<String>,

    /// Path prefixes forwarded without locale handling.
    #[serde(default = "default_bypass_prefixes")]
    pub bypass_prefixes: Vec<String>,
}

fn default_bypass_prefixes() -> Vec<String> {
    vec![
        "/_next".to_string(),
        "/api".to_string(),
        "/favicon.ico".to_string(),
    ]
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            default_locale: None,
            geo_header: None,
            bypass_prefixes: default_bypass_prefixes(),
        }
    }
}

/// Build-time static path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPathsConfig {
    /// Upper bound for enumerating one content type, in seconds.
    #[serde(default = "default_enumeration_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size requested from the backend.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Retries per page before the content type is given up on.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// When set, every path is expanded once per known locale under this param.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_param: Option<String>,

    /// Content types to enumerate.
    #[serde(default)]
    pub content_types: Vec<ContentTypeConfig>,
}

fn default_enumeration_timeout_secs() -> u64 {
    20
}

fn default_page_size() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    1
}

impl Default for StaticPathsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_enumeration_timeout_secs(),
            page_size: default_page_size(),
            max_retries: default_max_retries(),
            locale_param: None,
            content_types: Vec::new(),
        }
    }
}

/// A content type whose identifiers can be enumerated at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeConfig {
    /// Content type name (e.g. "category").
    pub name: String,
    /// Route parameter the identifier fills (e.g. "handle").
    #[serde(default = "default_param")]
    pub param: String,
    /// Backend collection path (e.g. "/store/product-categories").
    pub path: String,
    /// JSON key of the item array in the response.
    pub collection_key: String,
    /// Field of each item holding the identifier.
    #[serde(default = "default_param")]
    pub id_field: String,
}

fn default_param() -> String {
    "handle".to_string()
}

impl EdgeConfig {
    /// Load config from a TOML or JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: display.clone(),
            message: e.to_string(),
        })?;

        if display.ends_with(".json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })
        }
    }

    /// Load the config file nearest to `start`, if there is one.
    pub fn discover(start: &Path) -> Result<Option<Self>, ConfigError> {
        find_config_file(start).map(Self::load).transpose()
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend.base_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_PUBLISHABLE_KEY) {
            self.backend.publishable_key = Some(key);
        }
        if let Some(locale) = non_empty(ENV_DEFAULT_LOCALE) {
            self.router.default_locale = Some(locale);
        }
        if let Some(ttl) = non_empty(ENV_CACHE_TTL_SECS) {
            self.regions.cache_ttl_secs = ttl.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: ENV_CACHE_TTL_SECS.to_string(),
                value: ttl.clone(),
            })?;
        }

        Ok(self)
    }

    /// Check every setting, returning all problems found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.backend_url() {
            errors.push(e);
        }
        if let Err(e) = self.default_locale() {
            errors.push(e);
        }
        if self.regions.cache_ttl_secs == 0 {
            errors.push(ConfigError::ZeroCacheTtl);
        }

        let mut seen = std::collections::HashSet::new();
        for ct in &self.static_paths.content_types {
            if !seen.insert(ct.name.as_str()) {
                errors.push(ConfigError::DuplicateContentType(ct.name.clone()));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The validated backend base address, without a trailing slash.
    pub fn backend_url(&self) -> Result<&str, ConfigError> {
        let url = self
            .backend
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingBackendUrl)?;

        let valid = (url.starts_with("http://") || url.starts_with("https://"))
            && url.parse::<http::Uri>().is_ok_and(|u| u.host().is_some());

        if valid {
            Ok(url.trim_end_matches('/'))
        } else {
            Err(ConfigError::InvalidBackendUrl(url.to_string()))
        }
    }

    /// The validated default locale, if one is configured.
    pub fn default_locale(&self) -> Result<Option<LocaleCode>, ConfigError> {
        match self.router.default_locale.as_deref() {
            None => Ok(None),
            Some(raw) => LocaleCode::parse(raw)
                .map(Some)
                .ok_or_else(|| ConfigError::InvalidDefaultLocale(raw.to_string())),
        }
    }

    /// Region cache TTL.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.regions.cache_ttl_secs)
    }

    /// Region fetch timeout.
    pub fn region_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.region_timeout_ms)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Config file names, in lookup order within a directory.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["edge.toml", ".edge.toml", "edge.json"];

/// Find a config file in `start` or any parent directory.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Generate a starter edge.toml.
pub fn generate_default_config() -> String {
    r#"# Edge locale routing configuration

[backend]
base_url = "http://localhost:9000"
# publishable_key = "pk_..."
region_timeout_ms = 3000

[regions]
cache_ttl_secs = 3600

[router]
default_locale = "us"
# geo_header = "x-vercel-ip-country"
bypass_prefixes = ["/_next", "/api", "/favicon.ico"]

[static_paths]
timeout_secs = 20
page_size = 100
max_retries = 1
locale_param = "countryCode"

[[static_paths.content_types]]
name = "category"
path = "/store/product-categories"
collection_key = "product_categories"

[[static_paths.content_types]]
name = "collection"
path = "/store/collections"
collection_key = "collections"

[[static_paths.content_types]]
name = "product"
path = "/store/products"
collection_key = "products"
"#
    .to_string()
}
