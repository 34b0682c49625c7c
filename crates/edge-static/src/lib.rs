//! Build-time static path enumeration.
//!
//! This crate provides:
//! - `StaticPathEnumerator` - Pages through backend collections, never fails the build
//! - `ContentType` - A collection whose identifiers become route params
//! - `StaticPathSet` / `StaticPath` - Ordered param sets for pre-rendering
//! - `BuildPlan` / `RenderStrategy` - Per content type static or dynamic rendering
//!
//! A content type whose enumeration fails gets an empty path set and
//! [`RenderingMode::Dynamic`], plus a diagnostic. The plan only hands out
//! static params for content types that enumerated successfully.

mod content;
mod enumerator;
mod path;
mod plan;

pub use content::*;
pub use enumerator::*;
pub use path::*;
pub use plan::*;
