//! Locale routing for every inbound request.
//!
//! This crate provides:
//! - `EdgeRouter` - Decides pass-through, redirect, bypass, or unavailable
//! - `RouteDecision` - The decision, with its HTTP response mapping
//! - `RouterConfig` - Default locale, geo header, and bypass prefixes
//!
//! # Example
//!
//! ```ignore
//! use edge_core::RequestContext;
//! use edge_router::{EdgeRouter, RouterConfig};
//!
//! let router = EdgeRouter::new(resolver, RouterConfig::new().with_default_locale(us));
//! let decision = router.route(&RequestContext::new("/EN/products")).await;
//!
//! match decision.to_response() {
//!     Some(response) => { /* answer directly */ }
//!     None => { /* forward with decision.forward_headers() */ }
//! }
//! ```

mod config;
mod decision;
mod router;

pub use config::*;
pub use decision::*;
pub use router::*;
