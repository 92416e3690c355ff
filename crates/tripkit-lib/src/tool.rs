//! Descriptor of the `generate_trip` tool as advertised to MCP clients.

use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use serde::Serialize;
use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::request::GenerateTripArgs;

pub const TOOL_NAME: &str = "generate_trip";

const TOOL_TITLE: &str = "Generate trip itinerary";

const TOOL_DESCRIPTION: &str = "Generate a day-by-day travel itinerary for a destination \
and date range. Returns themed days with timed activities (attractions, meals, experiences), \
local tips, and a link to save and edit the trip. Use this when the user asks to plan a trip, \
build an itinerary, or wants ideas for what to do in a city over specific dates.";

/// Immutable tool metadata, serialized in the MCP `tools/list` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
    pub annotations: ToolAnnotations,
}

/// MCP behavioral hints for the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    pub read_only_hint: bool,
    pub destructive_hint: bool,
    pub idempotent_hint: bool,
    pub open_world_hint: bool,
}

static TOOL_DEFINITION: Lazy<ToolDefinition> = Lazy::new(|| ToolDefinition {
    name: TOOL_NAME,
    title: TOOL_TITLE,
    description: TOOL_DESCRIPTION,
    input_schema: schema_value::<GenerateTripArgs>(),
    output_schema: schema_value::<ResponseEnvelope>(),
    annotations: ToolAnnotations {
        read_only_hint: true,
        destructive_hint: false,
        // Each call produces a freshly generated itinerary.
        idempotent_hint: false,
        open_world_hint: true,
    },
});

/// The process-wide `generate_trip` descriptor. Built on first access.
pub fn tool_definition() -> &'static ToolDefinition {
    &TOOL_DEFINITION
}

fn schema_value<T: JsonSchema>() -> Value {
    let mut value =
        serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_is_shared() {
        assert!(std::ptr::eq(tool_definition(), tool_definition()));
        assert_eq!(tool_definition().name, "generate_trip");
    }

    #[test]
    fn test_input_schema_describes_request() {
        let schema = &tool_definition().input_schema;
        assert_eq!(schema["type"], "object");
        assert!(schema.get("$schema").is_none());

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"destination"));
        assert!(required.contains(&"start_date"));
        assert!(required.contains(&"end_date"));
        assert!(!required.contains(&"travelers"));

        assert_eq!(schema["additionalProperties"], false);
        assert!(schema["properties"]["travel_style"].is_object());
    }

    #[test]
    fn test_output_schema_describes_envelope() {
        let schema = &tool_definition().output_schema;
        assert!(schema["properties"]["ok"].is_object());
        assert!(schema["properties"]["data"].is_object());
        assert!(schema["properties"]["error"].is_object());
    }

    #[test]
    fn test_serializes_in_mcp_shape() {
        let value = serde_json::to_value(tool_definition()).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("outputSchema").is_some());
        assert_eq!(value["annotations"]["readOnlyHint"], true);
    }
}
