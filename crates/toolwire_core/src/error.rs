use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes carried in `ERROR` envelopes and exposed by client errors.
///
/// The wire form is the SCREAMING_SNAKE_CASE string returned by [`ErrorCode::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConnectionFailed,
    ConnectionLost,
    NotConnected,
    Timeout,
    ParameterInvalid,
    ToolNotFound,
    ToolExecutionFailed,
    ParseError,
    InternalError,
    InitializationFailed,
    ServerBusy,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionFailed => "CONNECTION_FAILED",
            ErrorCode::ConnectionLost => "CONNECTION_LOST",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::ParameterInvalid => "PARAMETER_INVALID",
            ErrorCode::ToolNotFound => "TOOL_NOT_FOUND",
            ErrorCode::ToolExecutionFailed => "TOOL_EXECUTION_FAILED",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::InitializationFailed => "INITIALIZATION_FAILED",
            ErrorCode::ServerBusy => "SERVER_BUSY",
        }
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "CONNECTION_FAILED" => Ok(ErrorCode::ConnectionFailed),
            "CONNECTION_LOST" => Ok(ErrorCode::ConnectionLost),
            "NOT_CONNECTED" => Ok(ErrorCode::NotConnected),
            "TIMEOUT" => Ok(ErrorCode::Timeout),
            "PARAMETER_INVALID" => Ok(ErrorCode::ParameterInvalid),
            "TOOL_NOT_FOUND" => Ok(ErrorCode::ToolNotFound),
            "TOOL_EXECUTION_FAILED" => Ok(ErrorCode::ToolExecutionFailed),
            "PARSE_ERROR" => Ok(ErrorCode::ParseError),
            "INTERNAL_ERROR" => Ok(ErrorCode::InternalError),
            "INITIALIZATION_FAILED" => Ok(ErrorCode::InitializationFailed),
            "SERVER_BUSY" => Ok(ErrorCode::ServerBusy),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failures while turning raw frames into envelopes or decoding payloads.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid envelope: {reason}")]
    Invalid { id: Option<String>, reason: String },

    #[error("invalid {message_type} payload: {source}")]
    Payload {
        message_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize envelope: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ProtocolError {
    /// The error code a peer should see for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::Parse(_) => ErrorCode::ParseError,
            ProtocolError::Invalid { .. } | ProtocolError::Payload { .. } => {
                ErrorCode::ParameterInvalid
            }
            ProtocolError::Serialize(_) => ErrorCode::InternalError,
        }
    }

    /// Id of the offending envelope, when one could be recovered.
    pub fn recovered_id(&self) -> Option<&str> {
        match self {
            ProtocolError::Invalid { id, .. } => id.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
