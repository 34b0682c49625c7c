//! Backend data service access for the edge layer.
//!
//! This crate provides:
//! - `BackendClient` - The region and collection queries, as a trait
//! - `HttpBackend` - HTTP implementation with per-endpoint timeouts
//! - `Endpoint` - Endpoint categories with default timeouts and retry budgets
//! - `RetryPolicy` - Bounded retry strategies
//! - Wire records (`RegionRecord`, `IdentifierPage`, ...)

mod client;
mod endpoint;
mod http;
mod records;
mod retry;
mod timeout;

pub use client::*;
pub use endpoint::*;
pub use http::*;
pub use records::*;
pub use retry::*;
pub use timeout::*;
