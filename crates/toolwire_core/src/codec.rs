//! Parsing and structural validation of inbound frames.
//!
//! Parsing happens in two stages so callers can tell malformed text
//! (`PARSE_ERROR`) from well-formed JSON that is not an envelope
//! (`PARAMETER_INVALID`).

use serde_json::Value as JsonValue;

use crate::error::ProtocolError;
use crate::message::{Envelope, MessageType};

/// Parses and validates one frame.
pub fn parse(raw: &str) -> Result<Envelope, ProtocolError> {
    let value: JsonValue = serde_json::from_str(raw).map_err(ProtocolError::Parse)?;
    validate(&value)?;
    serde_json::from_value(value).map_err(|e| ProtocolError::Invalid {
        id: None,
        reason: e.to_string(),
    })
}

/// Checks the envelope invariants on an already-parsed value.
///
/// Rejects anything missing `id`, `type`, `timestamp` or `payload`, and any
/// `type` outside the known set.
pub fn validate(value: &JsonValue) -> Result<(), ProtocolError> {
    let Some(obj) = value.as_object() else {
        return Err(invalid(None, "envelope must be a JSON object"));
    };

    let id = match obj.get("id") {
        Some(JsonValue::String(id)) => id.clone(),
        Some(_) => return Err(invalid(None, "field 'id' must be a string")),
        None => return Err(invalid(None, "missing field 'id'")),
    };

    match obj.get("type") {
        Some(JsonValue::String(t)) => {
            if MessageType::from_wire(t).is_none() {
                return Err(invalid(Some(id), format!("unknown message type '{t}'")));
            }
        }
        Some(_) => return Err(invalid(Some(id), "field 'type' must be a string")),
        None => return Err(invalid(Some(id), "missing field 'type'")),
    }

    match obj.get("timestamp") {
        Some(ts) if ts.is_i64() || ts.is_u64() => {}
        Some(_) => return Err(invalid(Some(id), "field 'timestamp' must be an integer")),
        None => return Err(invalid(Some(id), "missing field 'timestamp'")),
    }

    match obj.get("payload") {
        Some(JsonValue::Object(_)) => Ok(()),
        Some(_) => Err(invalid(Some(id), "field 'payload' must be an object")),
        None => Err(invalid(Some(id), "missing field 'payload'")),
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(value: &JsonValue) -> bool {
    validate(value).is_ok()
}

fn invalid(id: Option<String>, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Invalid {
        id,
        reason: reason.into(),
    }
}
