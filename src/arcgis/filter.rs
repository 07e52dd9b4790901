//! Input validation and query filter construction.
//!
//! Everything here is synchronous and local: a value that fails validation
//! never reaches the upstream service.

use serde::Serialize;

use crate::{AppError, Result};

/// Field holding the house number in the master address table.
pub const ADDRESS_NUMBER_FIELD: &str = "AddNo_Full";

/// Field holding the full street name in the master address table.
pub const STREET_NAME_FIELD: &str = "StNam_Full";

/// Spatial reference of incoming coordinates (WGS 84).
pub const WGS84_WKID: u32 = 4326;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    /// Latitude in degrees, within `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub lon: f64,
}

impl Coordinates {
    /// Validate a coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when either value is non-finite or out
    /// of range.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(AppError::Validation(
                "lat and lon must be finite numbers".into(),
            ));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::Validation("lat must be between -90 and 90".into()));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::Validation(
                "lon must be between -180 and 180".into(),
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Point geometry in the query service's JSON geometry format.
    #[must_use]
    pub fn to_geometry_json(&self) -> String {
        serde_json::json!({
            "x": self.lon,
            "y": self.lat,
            "spatialReference": { "wkid": WGS84_WKID },
        })
        .to_string()
    }
}

/// How a free-text address was split for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressTokens {
    /// Leading house number followed by street text, e.g. `14A` + `FAIRVIEW AVE`.
    NumberAndStreet {
        /// Leading token, starting with a digit.
        number: String,
        /// Remaining tokens joined by single spaces.
        street: String,
    },
    /// Anything else: matched against both fields as a whole.
    FreeText(String),
}

/// A validated, normalized address search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressQuery {
    normalized: String,
    tokens: AddressTokens,
}

impl AddressQuery {
    /// Validate and tokenize a free-text address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the input is empty after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(AppError::Validation(
                "address must be a non-empty string".into(),
            ));
        }

        let parts: Vec<&str> = normalized.split_whitespace().collect();
        let tokens = match parts.split_first() {
            Some((first, rest))
                if !rest.is_empty() && first.starts_with(|c: char| c.is_ascii_digit()) =>
            {
                AddressTokens::NumberAndStreet {
                    number: (*first).to_owned(),
                    street: rest.join(" "),
                }
            }
            _ => AddressTokens::FreeText(normalized.clone()),
        };

        Ok(Self { normalized, tokens })
    }

    /// Trimmed, uppercased input.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Token split used for the filter.
    #[must_use]
    pub fn tokens(&self) -> &AddressTokens {
        &self.tokens
    }

    /// Build the `where` clause for the address table.
    ///
    /// Every interpolated value passes through [`escape_literal`].
    #[must_use]
    pub fn where_clause(&self) -> String {
        match &self.tokens {
            AddressTokens::NumberAndStreet { number, street } => format!(
                "UPPER({ADDRESS_NUMBER_FIELD}) LIKE '%{}%' AND UPPER({STREET_NAME_FIELD}) LIKE '%{}%'",
                escape_literal(number),
                escape_literal(street),
            ),
            AddressTokens::FreeText(text) => {
                let escaped = escape_literal(text);
                format!(
                    "UPPER({STREET_NAME_FIELD}) LIKE '%{escaped}%' OR UPPER({ADDRESS_NUMBER_FIELD}) LIKE '%{escaped}%'"
                )
            }
        }
    }
}

/// Double every single quote so user text cannot terminate a string literal.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
