//! Shared protocol layer for toolwire.
//!
//! - **message**: the [`Envelope`] and its closed set of [`MessageType`]s
//! - **payload**: typed bodies for each message type
//! - **codec**: frame parsing and structural validation
//! - **transport**: newline-delimited framing over TCP
//! - **error**: [`ErrorCode`] taxonomy and [`ProtocolError`]

pub mod codec;
pub mod error;
pub mod message;
pub mod payload;
pub mod transport;

pub use codec::{is_valid, parse, validate};
pub use error::{ErrorCode, ProtocolError, Result};
pub use message::{Envelope, MessageType, UNKNOWN_ID, generate_id, now_millis};
pub use payload::{
    ErrorPayload, PingPayload, ToolCallPayload, ToolInfo, ToolOutcome, ToolResultPayload,
    ToolsListPayload,
};
