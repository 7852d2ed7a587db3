use serde_json::Value as JsonValue;
use thiserror::Error;
use toolwire_core::{ErrorCode, MessageType, ProtocolError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Not connected to server")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection lost before a response arrived")]
    ConnectionLost,

    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    Timeout { request_id: String, timeout_ms: u64 },

    /// The server answered with an `ERROR` envelope.
    #[error("{code}: {message}")]
    Remote {
        code: String,
        message: String,
        details: Option<JsonValue>,
    },

    #[error("Expected {expected} in reply, got {actual}")]
    UnexpectedResponse {
        expected: MessageType,
        actual: MessageType,
    },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Taxonomy string for this failure. Remote errors keep the server's
    /// code verbatim, including codes this build does not know.
    pub fn code(&self) -> &str {
        match self {
            ClientError::NotConnected => ErrorCode::NotConnected.as_str(),
            ClientError::ConnectionFailed(_) => ErrorCode::ConnectionFailed.as_str(),
            ClientError::ConnectionLost => ErrorCode::ConnectionLost.as_str(),
            ClientError::Timeout { .. } => ErrorCode::Timeout.as_str(),
            ClientError::Remote { code, .. } => code.as_str(),
            ClientError::UnexpectedResponse { .. } => ErrorCode::InternalError.as_str(),
            ClientError::Protocol(e) => e.code().as_str(),
            ClientError::Config(_) => ErrorCode::InitializationFailed.as_str(),
        }
    }

    /// Parsed form of [`ClientError::code`], `None` for unrecognised remote codes.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code().parse().ok()
    }

    /// Whether the failure concerns the connection rather than one request.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::NotConnected | ClientError::ConnectionFailed(_) | ClientError::ConnectionLost
        )
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
