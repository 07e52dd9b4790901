//! Maps raw upstream features onto the stable [`LookupResult`] shape.

use serde_json::Value;

use crate::arcgis::{Attributes, Coordinates, RawFeature};
use crate::models::lookup::{
    AddressCandidate, AddressCoordinates, AddressMatch, LookupResult, MultipleMatches, PointMatch,
    UNKNOWN_DISTRICT,
};

/// Zoning-layer fields that may carry the district, in priority order.
pub const DISTRICT_FIELDS: [&str; 6] = ["ACAD_TEXT", "ZONE", "ZONING", "DISTRICT", "District", "NAME"];

/// Address-table field carrying the district.
pub const ADDRESS_DISTRICT_FIELD: &str = "d_gis_zone";

const NO_DISTRICT_MESSAGE: &str = "No zoning district found for that location.";
const NO_ADDRESS_MESSAGE: &str =
    "No addresses found matching your search. Try using just the street name or number.";

/// Normalize a coordinate lookup. Only the first feature is reported.
#[must_use]
pub fn normalize_point(
    features: Vec<RawFeature>,
    point: Coordinates,
    source: &str,
) -> LookupResult {
    let Some(first) = features.into_iter().next() else {
        return LookupResult::not_found(NO_DISTRICT_MESSAGE);
    };

    let district = resolve_district(&first.attributes, &DISTRICT_FIELDS);
    LookupResult::Point(PointMatch {
        found: true,
        district,
        attributes: first.attributes,
        coordinates: point,
        source: source.to_owned(),
    })
}

/// Normalize an address search, preserving upstream order.
#[must_use]
pub fn normalize_address(features: Vec<RawFeature>, source: &str) -> LookupResult {
    let mut matches: Vec<AddressCandidate> = features.into_iter().map(address_candidate).collect();

    match matches.len() {
        0 => LookupResult::not_found(NO_ADDRESS_MESSAGE),
        1 => {
            let candidate = matches.remove(0);
            LookupResult::Address(AddressMatch {
                found: true,
                candidate,
                source: source.to_owned(),
            })
        }
        count => LookupResult::Multiple(MultipleMatches {
            found: true,
            multiple_matches: true,
            count,
            matches,
            message: format!("Found {count} matching addresses. Please be more specific."),
            source: source.to_owned(),
        }),
    }
}

/// Map one address-table record onto a candidate.
#[must_use]
pub fn address_candidate(feature: RawFeature) -> AddressCandidate {
    let attributes = feature.attributes;
    let number = display_value(attributes.get("AddNo_Full")).unwrap_or_default();
    let street = display_value(attributes.get("StNam_Full")).unwrap_or_default();

    AddressCandidate {
        address: format!("{number} {street}").trim().to_owned(),
        district: resolve_district(&attributes, &[ADDRESS_DISTRICT_FIELD]),
        coordinates: AddressCoordinates {
            lat: attributes.get("Latitude").cloned(),
            lon: attributes.get("Longitude").cloned(),
        },
        all_attributes: attributes,
    }
}

/// Raw value of the first field in `fields` holding a meaningful value, else
/// [`UNKNOWN_DISTRICT`].
#[must_use]
pub fn resolve_district(attributes: &Attributes, fields: &[&str]) -> Value {
    fields
        .iter()
        .filter_map(|field| attributes.get(*field))
        .find(|value| is_meaningful(value))
        .cloned()
        .unwrap_or_else(|| Value::String(UNKNOWN_DISTRICT.to_owned()))
}

/// Null, `false`, zero, and empty strings carry nothing.
fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_none_or(|n| n.abs() > 0.0),
        Value::Bool(true) | Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a scalar attribute for the address line.
fn display_value(value: Option<&Value>) -> Option<String> {
    match value.filter(|value| is_meaningful(value))? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
