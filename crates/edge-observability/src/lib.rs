//! Observability infrastructure for the edge locale routing layer.
//!
//! This crate provides:
//! - `init_logging` - Installs the `tracing` subscriber (JSON or human output)
//! - `EdgeMetrics` - Process-wide counters for cache, router, and build outcomes

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;
