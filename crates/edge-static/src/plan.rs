//! The build plan handed to the build pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::ContentType;
use crate::enumerator::{EnumerationDiagnostic, EnumerationOutcome};
use crate::path::{RenderingMode, StaticPathSet};

/// Rendering decision for one content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub content_type: String,
    pub mode: RenderingMode,
    pub paths: StaticPathSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<EnumerationDiagnostic>,
}

impl From<EnumerationOutcome> for PlanEntry {
    fn from(outcome: EnumerationOutcome) -> Self {
        Self {
            content_type: outcome.content_type,
            mode: outcome.mode,
            paths: outcome.paths,
            diagnostic: outcome.diagnostic,
        }
    }
}

/// How the page generator may render a content type.
///
/// Static params are only reachable through the `Static` arm, so a content
/// type that fell back to dynamic rendering cannot be treated as pre-known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy<'a> {
    Static(&'a StaticPathSet),
    Dynamic,
}

/// Per content type rendering decisions for one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub generated_at: DateTime<Utc>,
    entries: Vec<PlanEntry>,
}

impl BuildPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// A plan rendering every content type dynamically, for when enumeration
    /// cannot start at all.
    pub fn all_dynamic(content_types: &[ContentType], cause: &str) -> Self {
        let mut plan = Self::new();
        for content_type in content_types {
            plan.insert(EnumerationOutcome {
                content_type: content_type.name.clone(),
                paths: StaticPathSet::new(),
                mode: RenderingMode::Dynamic,
                diagnostic: Some(EnumerationDiagnostic {
                    content_type: content_type.name.clone(),
                    cause: cause.to_string(),
                    elapsed_ms: 0,
                }),
            });
        }
        plan
    }

    /// Add an outcome, replacing any earlier entry for the same content type.
    pub fn insert(&mut self, outcome: EnumerationOutcome) {
        let entry = PlanEntry::from(outcome);
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.content_type == entry.content_type)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Entries in enumeration order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Look up the entry for a content type.
    pub fn entry(&self, content_type: &str) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| e.content_type == content_type)
    }

    /// Rendering strategy for a content type. Unknown types render dynamically.
    pub fn strategy(&self, content_type: &str) -> RenderStrategy<'_> {
        match self.entry(content_type) {
            Some(entry) if entry.mode.is_static() => RenderStrategy::Static(&entry.paths),
            _ => RenderStrategy::Dynamic,
        }
    }

    /// Diagnostics for every content type that fell back to dynamic rendering.
    pub fn diagnostics(&self) -> impl Iterator<Item = &EnumerationDiagnostic> {
        self.entries.iter().filter_map(|e| e.diagnostic.as_ref())
    }

    /// Names of content types rendered dynamically.
    pub fn dynamic_types(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| !e.mode.is_static())
            .map(|e| e.content_type.as_str())
            .collect()
    }

    /// Total number of static paths across content types.
    pub fn total_paths(&self) -> usize {
        self.entries.iter().map(|e| e.paths.len()).sum()
    }

    /// Format as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for BuildPlan {
    fn default() -> Self {
        Self::new()
    }
}
