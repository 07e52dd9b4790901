//! `lookup_zoning_by_coordinates` tool.

use serde_json::json;

use super::{number_arg, Arguments, ToolContext, ToolDescriptor, ToolFuture};
use crate::arcgis::Coordinates;
use crate::config::LocationConfig;
use crate::lookup::normalize_point;
use crate::AppError;

/// Registered tool name.
pub const NAME: &str = "lookup_zoning_by_coordinates";

/// Descriptor advertised in `tools/list`.
#[must_use]
pub fn descriptor(location: &LocationConfig) -> ToolDescriptor {
    ToolDescriptor {
        name: NAME.to_owned(),
        description: format!(
            "Look up the zoning district for a location in {} using latitude and longitude \
             coordinates. Returns the official zoning district from the {}.",
            location.name, location.zoning_source
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "lat": {
                    "type": "number",
                    "description": "Latitude coordinate (between -90 and 90)",
                    "minimum": -90,
                    "maximum": 90
                },
                "lon": {
                    "type": "number",
                    "description": "Longitude coordinate (between -180 and 180)",
                    "minimum": -180,
                    "maximum": 180
                }
            },
            "required": ["lat", "lon"]
        }),
    }
}

/// Validate `lat`/`lon`, query the zoning layer, and normalize.
pub fn handle<'a>(context: &'a ToolContext, arguments: &'a Arguments) -> ToolFuture<'a> {
    Box::pin(async move {
        let (Some(lat), Some(lon)) = (number_arg(arguments, "lat"), number_arg(arguments, "lon"))
        else {
            return Err(AppError::Validation("lat and lon must be numbers".into()));
        };
        let point = Coordinates::new(lat, lon)?;

        let features = context.source.query_by_point(point).await?;
        Ok(normalize_point(features, point, &context.location.zoning_source))
    })
}
