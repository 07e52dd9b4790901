//! Normalized lookup results returned to calling agents.
//!
//! The serialized shape is part of the tool contract: field names are
//! camelCase and the raw upstream attribute maps travel alongside the
//! normalized fields.

use serde::Serialize;
use serde_json::Value;

use crate::arcgis::{Attributes, Coordinates};

/// Sentinel district used when no known attribute field carries a value.
pub const UNKNOWN_DISTRICT: &str = "Unknown";

/// Coordinates reported by the address table, passed through as stored.
/// A side the record lacks is left out of the serialized object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddressCoordinates {
    /// `Latitude` attribute, if the record has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    /// `Longitude` attribute, if the record has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<Value>,
}

/// One normalized address-table record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressCandidate {
    /// House number and street name joined by a space.
    pub address: String,
    /// Zoning district of the parcel, as stored upstream.
    pub district: Value,
    /// Reported location of the address point.
    pub coordinates: AddressCoordinates,
    /// Raw upstream attributes.
    pub all_attributes: Attributes,
}

/// Coordinate lookup that hit a zoning polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointMatch {
    /// Always `true`.
    pub found: bool,
    /// Resolved zoning district, as stored upstream.
    pub district: Value,
    /// Raw upstream attributes of the first feature.
    pub attributes: Attributes,
    /// The queried point.
    pub coordinates: Coordinates,
    /// Data source label.
    pub source: String,
}

/// Address lookup with exactly one match, flattened to the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressMatch {
    /// Always `true`.
    pub found: bool,
    /// The single match.
    #[serde(flatten)]
    pub candidate: AddressCandidate,
    /// Data source label.
    pub source: String,
}

/// Address lookup with more than one match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleMatches {
    /// Always `true`.
    pub found: bool,
    /// Always `true`.
    pub multiple_matches: bool,
    /// Number of entries in `matches`.
    pub count: usize,
    /// All matches, in upstream order.
    pub matches: Vec<AddressCandidate>,
    /// Disambiguation hint.
    pub message: String,
    /// Data source label.
    pub source: String,
}

/// Lookup that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotFound {
    /// Always `false`.
    pub found: bool,
    /// Explanation, with a retry hint for address searches.
    pub message: String,
}

/// Discriminated lookup result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupResult {
    /// Nothing matched.
    NotFound(NotFound),
    /// Coordinate lookup hit.
    Point(PointMatch),
    /// Single address match.
    Address(AddressMatch),
    /// Ambiguous address search.
    Multiple(MultipleMatches),
}

impl LookupResult {
    /// Build a `found: false` result.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(NotFound {
            found: false,
            message: message.into(),
        })
    }

    /// Whether the lookup matched anything.
    #[must_use]
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }

    /// Resolved district for single-hit results.
    #[must_use]
    pub fn district(&self) -> Option<&Value> {
        match self {
            Self::Point(hit) => Some(&hit.district),
            Self::Address(hit) => Some(&hit.candidate.district),
            Self::NotFound(_) | Self::Multiple(_) => None,
        }
    }
}
