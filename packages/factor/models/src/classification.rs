//! Open key/value maps carried by factors.
//!
//! [`Classification`] is what the resolver matches on; [`FactorValues`] is
//! the numeric payload. Both stay schemaless at the catalog boundary.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single classification value. Catalog data mixes strings
/// (`"Centrifugation"`) and numbers (`2019`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassValue {
    /// Text value.
    Text(String),
    /// Numeric value.
    Number(f64),
}

impl ClassValue {
    /// Returns the text form if this is a [`Self::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ClassValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ClassValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for ClassValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Free-form classification of a factor.
///
/// Null values in stored JSON are dropped on load: a key mapped to `null`
/// is the same as an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Option<ClassValue>>")]
pub struct Classification(BTreeMap<String, ClassValue>);

impl From<BTreeMap<String, Option<ClassValue>>> for Classification {
    fn from(raw: BTreeMap<String, Option<ClassValue>>) -> Self {
        Self(
            raw.into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        )
    }
}

impl Classification {
    /// Creates an empty classification.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<ClassValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a key.
    pub fn insert(&mut self, key: &str, value: impl Into<ClassValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Looks up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ClassValue> {
        self.0.get(key)
    }

    /// Looks up a key holding a text value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ClassValue::as_str)
    }

    /// Whether the key is present (with a non-null value).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClassValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

/// Numeric payload of a factor (`impact_score`, `active_power_w`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorValues(BTreeMap<String, f64>);

impl FactorValues {
    /// Creates an empty value map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.0.insert(key.to_string(), value);
        self
    }

    /// Looks up a value. Non-finite values are treated as missing.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().filter(|v| v.is_finite())
    }

    /// Iterates over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
