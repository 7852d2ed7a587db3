//! Maps inbound frames to reply envelopes.
//!
//! The dispatcher never touches sockets: it takes a raw frame and returns
//! the envelope to send back, or `None` when the frame is dropped.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use toolwire_core::{
    Envelope, ErrorCode, MessageType, ToolCallPayload, UNKNOWN_ID, codec,
};
use toolwire_observability::{record_duration, tool_call_span};
use toolwire_toolbus::ToolRegistry;
use tracing::{Instrument, debug, warn};

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Parses, validates and dispatches one frame.
    ///
    /// Malformed frames are answered with an `ERROR` envelope carrying the
    /// recovered id, or [`UNKNOWN_ID`] when none could be read.
    pub async fn handle_frame(&self, raw: &str) -> Option<Envelope> {
        match codec::parse(raw) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed envelope");
                let id = e.recovered_id().unwrap_or(UNKNOWN_ID).to_string();
                Some(Envelope::error(id, e.code(), e.to_string(), None))
            }
        }
    }

    /// Routes a validated envelope by type.
    pub async fn dispatch(&self, envelope: Envelope) -> Option<Envelope> {
        match envelope.message_type {
            MessageType::Ping => Some(Envelope::pong(&envelope)),
            MessageType::ListTools => {
                Some(Envelope::tools_list(&envelope, self.registry.list_all()))
            }
            MessageType::ToolCall => Some(self.handle_tool_call(&envelope).await),
            other => {
                warn!(
                    request_id = %envelope.id,
                    message_type = %other,
                    "No handler for message type, dropping"
                );
                None
            }
        }
    }

    async fn handle_tool_call(&self, request: &Envelope) -> Envelope {
        let payload: ToolCallPayload = match request.payload_as() {
            Ok(payload) => payload,
            Err(e) => {
                return Envelope::error(
                    request.id.clone(),
                    ErrorCode::ParameterInvalid,
                    e.to_string(),
                    None,
                );
            }
        };

        let Some(tool_name) = payload.tool_name.filter(|name| !name.is_empty()) else {
            return Envelope::error(
                request.id.clone(),
                ErrorCode::ParameterInvalid,
                "Missing toolName",
                None,
            );
        };

        let span = tool_call_span!(request.id.as_str(), tool_name.as_str());
        async {
            let start = Instant::now();
            let result = self.registry.call(&tool_name, payload.parameters).await;
            record_duration("tool.duration_ms", start.elapsed());

            match result {
                Ok(outcome) => {
                    debug!(success = outcome.success, "Tool completed");
                    Envelope::tool_result(request, tool_name.as_str(), outcome)
                }
                Err(e) => {
                    warn!(error = %e, "Tool call failed");
                    Envelope::error(
                        request.id.clone(),
                        e.code(),
                        e.to_string(),
                        Some(json!({ "toolName": tool_name })),
                    )
                }
            }
        }
        .instrument(span)
        .await
    }
}
