//! Enumerable content types.

use edge_core::ContentTypeConfig;
use edge_data::CollectionEndpoint;

/// A class of content whose identifiers become route params (categories,
/// collections, products).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Content type name, the key in the build plan.
    pub name: String,
    /// Route param each identifier fills.
    pub param: String,
    /// Backend collection holding the identifiers.
    pub endpoint: CollectionEndpoint,
}

impl ContentType {
    /// Create a new content type.
    pub fn new(name: impl Into<String>, param: impl Into<String>, endpoint: CollectionEndpoint) -> Self {
        Self {
            name: name.into(),
            param: param.into(),
            endpoint,
        }
    }

    /// Build from a `[[static_paths.content_types]]` entry.
    pub fn from_config(config: &ContentTypeConfig) -> Self {
        Self::new(
            &config.name,
            &config.param,
            CollectionEndpoint::new(&config.path, &config.collection_key, &config.id_field),
        )
    }

    /// Build every configured content type, in configuration order.
    pub fn from_configs(configs: &[ContentTypeConfig]) -> Vec<Self> {
        configs.iter().map(Self::from_config).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = ContentTypeConfig {
            name: "category".to_string(),
            param: "category".to_string(),
            path: "/store/product-categories".to_string(),
            collection_key: "product_categories".to_string(),
            id_field: "handle".to_string(),
        };

        let content_type = ContentType::from_config(&config);
        assert_eq!(content_type.name, "category");
        assert_eq!(content_type.endpoint.path, "/store/product-categories");
        assert_eq!(content_type.endpoint.collection_key, "product_categories");
    }
}
