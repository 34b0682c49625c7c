//! Core types for edge locale routing.
//!
//! This crate provides the fundamental types shared by the other edge crates:
//! - `EdgeConfig` - Configuration surface and validation
//! - `RequestContext` - Path, query, and headers of an inbound request
//! - `LocaleCode` - Normalized locale codes

mod config;
mod context;
mod locale;

pub use config::*;
pub use context::*;
pub use locale::*;
