//! Envelope and message type definitions.
//!
//! Every frame on the wire is one [`Envelope`]. Requests get a fresh id from
//! [`generate_id`]; responses copy the id of the request they answer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ErrorCode, ProtocolError};
use crate::payload::{
    ErrorPayload, PingPayload, ToolCallPayload, ToolInfo, ToolOutcome, ToolResultPayload,
    ToolsListPayload,
};

/// Id used on replies to frames whose own id could not be recovered.
pub const UNKNOWN_ID: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Ping,
    Pong,
    ToolCall,
    ToolResult,
    ListTools,
    ToolsList,
    Error,
    /// Reserved; the server has no handler for it.
    RegisterTool,
    /// Reserved; the server has no handler for it.
    UnregisterTool,
    /// Reserved; the server has no handler for it.
    RegistrationResult,
}

impl MessageType {
    pub const ALL: [MessageType; 10] = [
        MessageType::Ping,
        MessageType::Pong,
        MessageType::ToolCall,
        MessageType::ToolResult,
        MessageType::ListTools,
        MessageType::ToolsList,
        MessageType::Error,
        MessageType::RegisterTool,
        MessageType::UnregisterTool,
        MessageType::RegistrationResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::ToolCall => "TOOL_CALL",
            MessageType::ToolResult => "TOOL_RESULT",
            MessageType::ListTools => "LIST_TOOLS",
            MessageType::ToolsList => "TOOLS_LIST",
            MessageType::Error => "ERROR",
            MessageType::RegisterTool => "REGISTER_TOOL",
            MessageType::UnregisterTool => "UNREGISTER_TOOL",
            MessageType::RegistrationResult => "REGISTRATION_RESULT",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Whether this type is a reply that resolves a pending request.
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            MessageType::Pong
                | MessageType::ToolResult
                | MessageType::ToolsList
                | MessageType::Error
                | MessageType::RegistrationResult
        )
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub payload: JsonValue,
    pub timestamp: i64,
}

/// Current time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generates a request id: epoch millis plus a random suffix.
///
/// Unique enough to never collide among the outstanding requests of one
/// connection; not meant to be unguessable.
pub fn generate_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("msg_{}_{}", now_millis(), &suffix[..9])
}

impl Envelope {
    pub fn new(id: impl Into<String>, message_type: MessageType, payload: JsonValue) -> Self {
        Self {
            id: id.into(),
            message_type,
            payload,
            timestamp: now_millis(),
        }
    }

    fn request(message_type: MessageType, payload: JsonValue) -> Self {
        Self::new(generate_id(), message_type, payload)
    }

    fn to_payload<T: Serialize>(payload: &T) -> JsonValue {
        // Payload structs only hold strings, numbers and JSON values.
        serde_json::to_value(payload).unwrap_or_else(|_| JsonValue::Object(Default::default()))
    }

    pub fn ping() -> Self {
        Self::request(
            MessageType::Ping,
            Self::to_payload(&PingPayload {
                timestamp: now_millis(),
            }),
        )
    }

    pub fn pong(request: &Envelope) -> Self {
        Self::new(
            request.id.clone(),
            MessageType::Pong,
            Self::to_payload(&PingPayload {
                timestamp: now_millis(),
            }),
        )
    }

    pub fn tool_call(tool_name: impl Into<String>, parameters: JsonValue) -> Self {
        Self::request(
            MessageType::ToolCall,
            Self::to_payload(&ToolCallPayload {
                tool_name: Some(tool_name.into()),
                parameters,
            }),
        )
    }

    pub fn tool_result(request: &Envelope, tool_name: impl Into<String>, result: ToolOutcome) -> Self {
        Self::new(
            request.id.clone(),
            MessageType::ToolResult,
            Self::to_payload(&ToolResultPayload {
                tool_name: tool_name.into(),
                result,
            }),
        )
    }

    pub fn list_tools() -> Self {
        Self::request(MessageType::ListTools, serde_json::json!({}))
    }

    pub fn tools_list(request: &Envelope, tools: Vec<ToolInfo>) -> Self {
        Self::new(
            request.id.clone(),
            MessageType::ToolsList,
            Self::to_payload(&ToolsListPayload { tools }),
        )
    }

    pub fn error(
        id: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self::new(
            id,
            MessageType::Error,
            Self::to_payload(&ErrorPayload {
                code: code.as_str().to_string(),
                message: message.into(),
                details,
            }),
        )
    }

    /// Decodes the payload into its typed form.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_value(self.payload.clone()).map_err(|source| ProtocolError::Payload {
            message_type: self.message_type.to_string(),
            source,
        })
    }

    /// Serializes to a single-line JSON frame.
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Serialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_wire_names() {
        for t in MessageType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(MessageType::from_wire(t.as_str()), Some(t));
        }
        assert_eq!(MessageType::from_wire("tool_call"), None);
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id();
        assert!(id.starts_with("msg_"));
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 9);
    }

    #[test]
    fn test_generate_id_unique() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_tool_call_envelope() {
        let env = Envelope::tool_call("echo", json!({"v": "x"}));
        assert_eq!(env.message_type, MessageType::ToolCall);
        assert_eq!(env.payload["toolName"], "echo");
        assert_eq!(env.payload["parameters"]["v"], "x");
        assert!(env.timestamp > 0);
    }

    #[test]
    fn test_responses_copy_request_id() {
        let req = Envelope::ping();
        let pong = Envelope::pong(&req);
        assert_eq!(pong.id, req.id);
        assert_eq!(pong.message_type, MessageType::Pong);

        let list = Envelope::list_tools();
        let reply = Envelope::tools_list(&list, vec![]);
        assert_eq!(reply.id, list.id);
        assert_eq!(reply.payload, json!({"tools": []}));
    }

    #[test]
    fn test_error_envelope_payload() {
        let env = Envelope::error("abc", ErrorCode::ToolNotFound, "Tool not found: x", None);
        assert_eq!(env.id, "abc");
        assert_eq!(env.payload["code"], "TOOL_NOT_FOUND");
        assert_eq!(env.payload["message"], "Tool not found: x");
        assert!(env.payload.get("details").is_none());
    }

    #[test]
    fn test_frame_uses_type_field() {
        let frame = Envelope::list_tools().to_frame().unwrap();
        assert!(frame.contains(r#""type":"LIST_TOOLS""#));
        assert!(!frame.contains('\n'));
    }

    #[test]
    fn test_payload_as_reports_type() {
        let env = Envelope::new("1", MessageType::ToolsList, json!({"tools": 5}));
        let err = env.payload_as::<ToolsListPayload>().unwrap_err();
        assert!(err.to_string().contains("TOOLS_LIST"));
    }
}
