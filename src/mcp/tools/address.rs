//! `lookup_zoning_by_address` tool.

use serde_json::{json, Value};

use super::{Arguments, ToolContext, ToolDescriptor, ToolFuture};
use crate::arcgis::AddressQuery;
use crate::config::LocationConfig;
use crate::lookup::normalize_address;
use crate::AppError;

/// Registered tool name.
pub const NAME: &str = "lookup_zoning_by_address";

/// Descriptor advertised in `tools/list`.
#[must_use]
pub fn descriptor(location: &LocationConfig) -> ToolDescriptor {
    ToolDescriptor {
        name: NAME.to_owned(),
        description: format!(
            "Look up the zoning district for a location in {} using a street address. \
             Searches the {} and returns the zoning district along with the full address \
             and coordinates. Returns multiple matches if the address is ambiguous.",
            location.name, location.address_source
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "Street address or partial address to search for \
                                    (e.g., '123 Main Street', 'Main St', or just '123')"
                }
            },
            "required": ["address"]
        }),
    }
}

/// Validate `address`, query the address table, and normalize.
pub fn handle<'a>(context: &'a ToolContext, arguments: &'a Arguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let raw = arguments
            .get("address")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Validation("address must be a non-empty string".into()))?;
        let query = AddressQuery::parse(raw)?;

        let features = context.source.query_by_address_text(&query).await?;
        Ok(normalize_address(features, &context.location.address_source))
    })
}
