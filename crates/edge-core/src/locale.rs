//! Locale codes used as the first path segment of storefront URLs.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum accepted length of a locale code.
const MAX_LEN: usize = 16;

/// A normalized locale code (e.g. `us`, `en-gb`).
///
/// Normalization trims whitespace, folds ASCII case, and maps `_` to `-`,
/// so `EN_GB`, `en-GB` and `en-gb` all produce the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Parse and normalize a raw code. Returns `None` when the input cannot
    /// be a locale code at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
            .collect();

        if normalized.is_empty() || normalized.len() > MAX_LEN {
            return None;
        }
        if normalized.starts_with('-') || normalized.ends_with('-') || normalized.contains("--") {
            return None;
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return None;
        }

        Some(Self(normalized))
    }

    /// Whether `raw` is exactly the canonical spelling of this code.
    pub fn is_canonical_spelling(&self, raw: &str) -> bool {
        self.0 == raw
    }

    /// Check if a raw path segment has the shape of a locale code
    /// (`xx`, `xx-yy` or `xx-999`), regardless of whether any region serves it.
    /// Three-letter segments are not locale-shaped; they collide with content
    /// paths such as `/faq`.
    pub fn looks_like_locale(raw: &str) -> bool {
        let Some(code) = Self::parse(raw) else {
            return false;
        };

        let mut parts = code.0.split('-');
        let language = parts.next().unwrap_or_default();
        let country = parts.next();

        if parts.next().is_some() {
            return false;
        }
        if language.len() != 2 || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return false;
        }
        match country {
            None => true,
            Some(c) if c.len() == 2 => c.chars().all(|c| c.is_ascii_alphabetic()),
            Some(c) => c.len() == 3 && c.chars().all(|c| c.is_ascii_digit()),
        }
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocaleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for LocaleCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LocaleCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid locale code: {:?}", raw)))
    }
}
