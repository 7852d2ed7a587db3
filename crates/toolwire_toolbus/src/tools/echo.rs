use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use toolwire_core::ToolOutcome;

use super::{Tool, ToolResult};

/// Returns its `v` parameter unchanged.
pub struct Echo;

#[async_trait]
impl Tool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Returns the value passed as `v` unchanged."
    }

    fn parameters_schema(&self) -> JsonValue {
        json!({
            "type": "object",
            "properties": {
                "v": {"type": "any", "description": "Value to echo back"}
            },
            "required": ["v"]
        })
    }

    async fn execute(&self, params: JsonValue) -> ToolResult {
        match params.get("v") {
            Some(v) => Ok(ToolOutcome::ok(v.clone())),
            None => Ok(ToolOutcome::failed("missing required parameter 'v'")),
        }
    }
}
