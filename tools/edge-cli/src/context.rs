//! CLI execution context.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use edge_cache::{RefreshPolicy, RegionResolver};
use edge_core::{find_config_file, ConfigError, EdgeConfig};
use edge_data::{Endpoint, HttpBackend, TimeoutConfig};
use edge_observability::EdgeMetrics;
use edge_router::{EdgeRouter, RouterConfig};
use edge_static::ContentType;

use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Edge configuration, with environment overrides applied.
    pub config: EdgeConfig,
    /// File the configuration was loaded from, if any.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// Counters shared by everything this invocation builds.
    pub metrics: Arc<EdgeMetrics>,
}

impl Context {
    /// Load context from an explicit config file or the nearest one found.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => {
                let path = cwd.join(path);
                let config = EdgeConfig::load(&path)?;
                (config, Some(path))
            }
            None => match find_config_file(&cwd) {
                Some(path) => (EdgeConfig::load(&path)?, Some(path)),
                None => (EdgeConfig::default(), None),
            },
        };

        let config = config
            .with_env_overrides()
            .context("Invalid environment override")?;

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            metrics: Arc::new(EdgeMetrics::new()),
        })
    }

    /// HTTP client for the configured backend.
    pub fn backend(&self) -> Result<Arc<HttpBackend>, ConfigError> {
        let base_url = self.config.backend_url()?;

        let mut backend = HttpBackend::new(base_url).with_timeout(
            Endpoint::Regions,
            TimeoutConfig::from_total(self.config.region_timeout()),
        );
        if let Some(key) = &self.config.backend.publishable_key {
            backend = backend.with_publishable_key(key);
        }

        Ok(Arc::new(backend))
    }

    /// Region resolver over the configured backend.
    pub fn resolver(&self) -> Result<RegionResolver, ConfigError> {
        if self.config.regions.cache_ttl_secs == 0 {
            return Err(ConfigError::ZeroCacheTtl);
        }

        Ok(RegionResolver::with_metrics(
            self.backend()?,
            RefreshPolicy::from_config(&self.config),
            Arc::clone(&self.metrics),
        ))
    }

    /// Router over the configured backend; a misconfigured router if the
    /// configuration cannot produce one.
    pub fn router(&self) -> EdgeRouter {
        let built = self.resolver().and_then(|resolver| {
            RouterConfig::from_settings(&self.config.router)
                .map(|config| EdgeRouter::new(resolver, config))
        });

        match built {
            Ok(router) => router,
            Err(error) => EdgeRouter::misconfigured(error).with_metrics(Arc::clone(&self.metrics)),
        }
    }

    /// Every configured content type, in configuration order.
    pub fn content_types(&self) -> Vec<ContentType> {
        ContentType::from_configs(&self.config.static_paths.content_types)
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}
