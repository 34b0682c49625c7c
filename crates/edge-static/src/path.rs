//! Static paths and rendering modes.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One set of route params to pre-render, in param order.
///
/// Serialized as a JSON object whose keys keep this order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StaticPath {
    params: Vec<(String, String)>,
}

impl StaticPath {
    /// Create an empty param set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A path with a single param.
    pub fn single(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new().with(param, value)
    }

    /// Append a param.
    pub fn with(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((param.into(), value.into()));
        self
    }

    /// Params in order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Look up a param value.
    pub fn get(&self, param: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, value)| value.as_str())
    }

    /// Number of params.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if there are no params.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Serialize for StaticPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len()))?;
        for (name, value) in &self.params {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for StaticPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = StaticPath;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of route params to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut params = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    params.push((name, value));
                }
                Ok(StaticPath { params })
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

/// Ordered param sets for one content type. Empty is a valid, successful result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticPathSet {
    paths: Vec<StaticPath>,
}

impl StaticPathSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path.
    pub fn push(&mut self, path: StaticPath) {
        self.paths.push(path);
    }

    /// Paths in order.
    pub fn paths(&self) -> &[StaticPath] {
        &self.paths
    }

    /// Iterate over paths.
    pub fn iter(&self) -> std::slice::Iter<'_, StaticPath> {
        self.paths.iter()
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if there are no paths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl From<Vec<StaticPath>> for StaticPathSet {
    fn from(paths: Vec<StaticPath>) -> Self {
        Self { paths }
    }
}

impl FromIterator<StaticPath> for StaticPathSet {
    fn from_iter<I: IntoIterator<Item = StaticPath>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StaticPathSet {
    type Item = &'a StaticPath;
    type IntoIter = std::slice::Iter<'a, StaticPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// How pages of a content type are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderingMode {
    /// Pre-rendered at build time from the enumerated params.
    Static,
    /// Rendered per request.
    Dynamic,
}

impl RenderingMode {
    /// Check if this is static rendering.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static)
    }
}

impl fmt::Display for RenderingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_serializes_in_param_order() {
        let path = StaticPath::single("countryCode", "us").with("handle", "shirt");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"{"countryCode":"us","handle":"shirt"}"#);

        let parsed: StaticPath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.params()[0].0, "countryCode");
        assert_eq!(parsed.get("handle"), Some("shirt"));
    }

    #[test]
    fn test_empty_set_serializes_as_array() {
        let set = StaticPathSet::new();
        assert_eq!(serde_json::to_string(&set).unwrap(), "[]");
        assert!(set.is_empty());
    }

    #[test]
    fn test_rendering_mode() {
        assert_eq!(serde_json::to_string(&RenderingMode::Dynamic).unwrap(), r#""dynamic""#);
        assert!(RenderingMode::Static.is_static());
        assert_eq!(RenderingMode::Static.to_string(), "static");
    }
}
