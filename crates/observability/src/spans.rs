//! Span helpers shared by the server and client

/// Span covering one accepted connection.
///
/// ```rust
/// use toolwire_observability::connection_span;
///
/// let span = connection_span!(7_u64, "127.0.0.1:50000");
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! connection_span {
    ($connection_id:expr, $peer:expr) => {
        tracing::info_span!(
            "toolwire.connection",
            connection.id = $connection_id,
            peer.addr = %$peer,
        )
    };
}

/// Span covering one tool invocation on the server.
///
/// `tool.duration_ms` starts empty; fill it with [`record_duration`](crate::record_duration).
#[macro_export]
macro_rules! tool_call_span {
    ($request_id:expr, $tool_name:expr) => {
        tracing::info_span!(
            "toolwire.tool_call",
            request.id = $request_id,
            tool.name = $tool_name,
            tool.duration_ms = tracing::field::Empty,
        )
    };
}

/// Span covering one client request awaiting its response.
#[macro_export]
macro_rules! client_request_span {
    ($request_id:expr, $message_type:expr) => {
        tracing::debug_span!(
            "toolwire.request",
            request.id = $request_id,
            message.kind = %$message_type,
            request.duration_ms = tracing::field::Empty,
            error = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    };
}

/// Marks the current span as failed and logs the error.
pub fn record_error<E: std::error::Error>(error: &E) {
    let span = tracing::Span::current();
    span.record("error", true);
    span.record("error.message", error.to_string());
    tracing::warn!(error = %error, "Operation failed");
}

/// Records a duration in milliseconds on the current span.
pub fn record_duration(key: &str, duration: std::time::Duration) {
    let span = tracing::Span::current();
    span.record(key, duration.as_millis() as u64);
}
