//! Typed payload bodies for each message type.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Advertised description of a server-side tool, including usage stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    /// JSON-schema-like object: `{type, properties, required}`.
    pub parameters: JsonValue,
    pub enabled: bool,
    pub usage_count: u64,
    /// Epoch millis of the last successful dispatch.
    pub last_used: Option<i64>,
}

/// Result of running a tool to completion.
///
/// `success: false` is an application-level failure reported by the tool
/// itself; a tool that could not run at all is reported as an `ERROR` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Elapsed milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}

impl ToolOutcome {
    pub fn ok(data: JsonValue) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time: None,
        }
    }

    pub fn with_execution_time(mut self, millis: u64) -> Self {
        self.execution_time = Some(millis);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallPayload {
    /// Optional so a missing name can be answered with `PARAMETER_INVALID`.
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default = "empty_object")]
    pub parameters: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPayload {
    pub tool_name: String,
    pub result: ToolOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsListPayload {
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingPayload {
    pub timestamp: i64,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}
