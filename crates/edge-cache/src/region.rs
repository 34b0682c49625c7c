//! Regions and the region snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use edge_core::LocaleCode;
use edge_data::RegionRecord;
use serde::Serialize;
use tokio::time::Instant;

/// A commercial/serving zone covering one or more locale codes.
///
/// Immutable once built; a refresh replaces the whole snapshot instead of
/// touching individual regions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    /// Backend region identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Default currency, passed through untouched.
    pub currency_code: String,
    /// Locale codes served, in backend order.
    pub locales: Vec<LocaleCode>,
    /// Opaque metadata.
    pub metadata: serde_json::Value,
}

impl Region {
    /// Build a region from its wire record.
    ///
    /// Country codes that are not valid locale codes are dropped with a warning.
    pub fn from_record(record: RegionRecord) -> Self {
        let mut locales: Vec<LocaleCode> = Vec::with_capacity(record.countries.len());

        for country in &record.countries {
            match LocaleCode::parse(&country.iso_2) {
                Some(code) if !locales.contains(&code) => locales.push(code),
                Some(_) => {}
                None => tracing::warn!(
                    region = %record.id,
                    code = %country.iso_2,
                    "skipping invalid locale code"
                ),
            }
        }

        Self {
            id: record.id,
            name: record.name,
            currency_code: record.currency_code,
            locales,
            metadata: record.metadata.unwrap_or(serde_json::Value::Null),
        }
    }

    /// Check if this region serves a locale.
    pub fn serves(&self, code: &LocaleCode) -> bool {
        self.locales.contains(code)
    }
}

/// The region cache contents: one atomic snapshot of the backend's region list.
///
/// A snapshot is only ever built whole, from one successful fetch, and carries a
/// single refresh timestamp for all of its entries.
#[derive(Debug)]
pub struct RegionSnapshot {
    by_locale: HashMap<LocaleCode, Arc<Region>>,
    regions: Vec<Arc<Region>>,
    refreshed_at: Instant,
}

impl RegionSnapshot {
    /// Build a snapshot from the backend's region list.
    ///
    /// When two regions claim the same locale, the one listed first keeps it.
    pub fn from_records(records: Vec<RegionRecord>, refreshed_at: Instant) -> Self {
        let mut by_locale = HashMap::new();
        let mut regions = Vec::with_capacity(records.len());

        for record in records {
            let region = Arc::new(Region::from_record(record));

            for code in &region.locales {
                match by_locale.get(code) {
                    Some(existing) => {
                        let existing: &Arc<Region> = existing;
                        tracing::warn!(
                            code = %code,
                            kept = %existing.id,
                            ignored = %region.id,
                            "locale served by more than one region"
                        );
                    }
                    None => {
                        by_locale.insert(code.clone(), Arc::clone(&region));
                    }
                }
            }

            regions.push(region);
        }

        Self {
            by_locale,
            regions,
            refreshed_at,
        }
    }

    /// Look up the region serving a locale.
    pub fn get(&self, code: &LocaleCode) -> Option<&Arc<Region>> {
        self.by_locale.get(code)
    }

    /// All regions, in backend order.
    pub fn regions(&self) -> &[Arc<Region>] {
        &self.regions
    }

    /// Every routable locale code, in backend order.
    pub fn locales(&self) -> Vec<LocaleCode> {
        self.regions
            .iter()
            .flat_map(|region| {
                region
                    .locales
                    .iter()
                    .filter(|code| self.by_locale.get(*code).is_some_and(|r| Arc::ptr_eq(r, region)))
            })
            .cloned()
            .collect()
    }

    /// Number of routable locale codes.
    pub fn len(&self) -> usize {
        self.by_locale.len()
    }

    /// Check if no locale is routable.
    pub fn is_empty(&self) -> bool {
        self.by_locale.is_empty()
    }

    /// When the snapshot was fetched.
    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }

    /// Age of the snapshot at `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.refreshed_at)
    }

    /// Check if the snapshot is older than `ttl` at `now`.
    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        self.age(now) > ttl
    }
}
