//! Wire records returned by the backend data service.

use serde::{Deserialize, Serialize};

/// One region as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    /// Backend region identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Default currency, passed through untouched.
    #[serde(default)]
    pub currency_code: String,
    /// Countries served by this region, in backend order.
    #[serde(default)]
    pub countries: Vec<CountryRecord>,
    /// Opaque metadata.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// A country entry within a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Two-letter code used as the locale path segment.
    pub iso_2: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Body of the region list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionList {
    pub regions: Vec<RegionRecord>,
}

/// Response collection to enumerate identifiers from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEndpoint {
    /// Path relative to the backend base address.
    pub path: String,
    /// JSON key of the item array in the response body.
    pub collection_key: String,
    /// Field of each item holding the identifier.
    pub id_field: String,
}

impl CollectionEndpoint {
    /// Create a new collection endpoint.
    pub fn new(
        path: impl Into<String>,
        collection_key: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            collection_key: collection_key.into(),
            id_field: id_field.into(),
        }
    }

    /// Extract one page of identifiers from a response body.
    ///
    /// Items without a string identifier are skipped; a missing collection key
    /// is an error since it means the endpoint is not what we think it is.
    pub fn parse_page(&self, body: &serde_json::Value) -> Result<IdentifierPage, String> {
        let items = body
            .get(&self.collection_key)
            .and_then(|v| v.as_array())
            .ok_or_else(|| format!("response has no {:?} array", self.collection_key))?;

        let identifiers = items
            .iter()
            .filter_map(|item| item.get(&self.id_field).and_then(|v| v.as_str()))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        let total = body.get("count").and_then(|v| v.as_u64());

        Ok(IdentifierPage {
            identifiers,
            returned: items.len(),
            total,
        })
    }
}

/// Offset-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u32,
}

impl PageRequest {
    /// First page of the given size.
    pub fn first(limit: u32) -> Self {
        Self { offset: 0, limit }
    }
}

/// One page of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentifierPage {
    /// Identifiers in backend order.
    pub identifiers: Vec<String>,
    /// Items in the page, including ones without a usable identifier.
    pub returned: usize,
    /// Total item count reported by the backend, if any.
    pub total: Option<u64>,
}

impl IdentifierPage {
    /// Build a page from identifiers alone.
    pub fn new(identifiers: Vec<String>, total: Option<u64>) -> Self {
        Self {
            returned: identifiers.len(),
            identifiers,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_region_list_deserializes() {
        let body = json!({
            "regions": [{
                "id": "reg_eu",
                "name": "Europe",
                "currency_code": "eur",
                "countries": [{"iso_2": "de"}, {"iso_2": "fr", "display_name": "France"}],
                "metadata": {"tax": "incl"}
            }]
        });

        let list: RegionList = serde_json::from_value(body).unwrap();
        assert_eq!(list.regions.len(), 1);
        assert_eq!(list.regions[0].countries[1].iso_2, "fr");
    }

    #[test]
    fn test_parse_page() {
        let endpoint = CollectionEndpoint::new("/store/products", "products", "handle");
        let body = json!({
            "products": [{"handle": "shirt"}, {"handle": ""}, {"id": "no-handle"}, {"handle": "pants"}],
            "count": 40,
            "offset": 0,
            "limit": 4
        });

        let page = endpoint.parse_page(&body).unwrap();
        assert_eq!(page.identifiers, vec!["shirt", "pants"]);
        assert_eq!(page.returned, 4);
        assert_eq!(page.total, Some(40));
    }

    #[test]
    fn test_parse_page_missing_collection() {
        let endpoint = CollectionEndpoint::new("/store/products", "products", "handle");
        assert!(endpoint.parse_page(&json!({"items": []})).is_err());
    }
}
