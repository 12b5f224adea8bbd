//! Restyle request value objects

use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a target voice style, e.g. `narrator-warm`.
///
/// Opaque to this crate; the provider defines the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoiceStyleId(String);

impl VoiceStyleId {
    /// Create a voice style id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceStyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VoiceStyleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for VoiceStyleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Deterministic identity of a restyle request, used as the cache key.
///
/// Two requests with the same style and the same enhancement pairs always
/// produce the same fingerprint, regardless of the order the pairs were
/// added in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Get the canonical string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value object describing one requested transformation.
///
/// Enhancements are free-form `category -> value` pairs (`emotion: warm`,
/// `pace: slow`). They are held in a `BTreeMap` so iteration order, and
/// therefore the fingerprint, never depends on insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestyleRequest {
    style: VoiceStyleId,
    enhancements: BTreeMap<String, String>,
}

impl RestyleRequest {
    /// Create a request with no enhancements
    pub fn new(style: impl Into<VoiceStyleId>) -> Self {
        Self {
            style: style.into(),
            enhancements: BTreeMap::new(),
        }
    }

    /// Add one enhancement pair, replacing any previous value for the category
    pub fn with_enhancement(mut self, category: impl Into<String>, value: impl Into<String>) -> Self {
        self.enhancements.insert(category.into(), value.into());
        self
    }

    /// Add several enhancement pairs
    pub fn with_enhancements<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (category, value) in pairs {
            self.enhancements.insert(category.into(), value.into());
        }
        self
    }

    /// Get the target style
    pub fn style(&self) -> &VoiceStyleId {
        &self.style
    }

    /// Get the enhancement pairs, ordered by category
    pub fn enhancements(&self) -> &BTreeMap<String, String> {
        &self.enhancements
    }

    /// Compute the cache key for this request.
    ///
    /// Format: `<style>:<category>:<value>|<category>:<value>|...` with the
    /// pairs in category order.
    pub fn fingerprint(&self) -> Fingerprint {
        let pairs = self
            .enhancements
            .iter()
            .map(|(category, value)| format!("{}:{}", category, value))
            .collect::<Vec<_>>()
            .join("|");
        Fingerprint(format!("{}:{}", self.style, pairs))
    }
}
