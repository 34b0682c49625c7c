//! Region cache for the edge locale routing layer.
//!
//! This crate provides:
//! - `RegionResolver` - Locale to region resolution with single-flight refresh
//! - `RegionSnapshot` - One atomic copy of the backend's region list
//! - `Region` - A serving zone and the locale codes it covers
//! - `RefreshPolicy` - Snapshot TTL and fetch timeout
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{RefreshPolicy, RegionResolver};
//! use edge_data::HttpBackend;
//!
//! let backend = Arc::new(HttpBackend::new("http://backend:9000"));
//! let resolver = RegionResolver::new(backend, RefreshPolicy::default());
//!
//! let resolved = resolver.resolve("us").await?;
//! println!("{} -> {}", resolved.code, resolved.region.name);
//! ```

mod policy;
mod region;
mod resolver;

pub use policy::*;
pub use region::*;
pub use resolver::*;
