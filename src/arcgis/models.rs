//! Wire types returned by the upstream feature-query service.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Attribute map of a single feature, preserved verbatim.
pub type Attributes = Map<String, Value>;

/// One record returned by a feature query.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawFeature {
    /// Attribute map; absent or null attributes deserialize as an empty map.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Attributes,
    /// Geometry payload. Queries ask for none, but tolerate it when present.
    #[serde(default)]
    pub geometry: Option<Value>,
}

impl RawFeature {
    /// Build a feature from an attribute map.
    #[must_use]
    pub fn with_attributes(attributes: Attributes) -> Self {
        Self {
            attributes,
            geometry: None,
        }
    }
}

/// Top-level JSON body of a `/{layer}/query` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureQueryResponse {
    /// Structured error embedded in an otherwise successful response.
    #[serde(default)]
    pub error: Option<Value>,
    /// Returned features, in upstream order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<RawFeature>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
