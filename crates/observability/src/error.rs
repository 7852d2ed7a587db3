//! Error types for observability crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObservabilityError {
    #[error("Failed to initialize observability: {0}")]
    InitFailed(String),

    #[error("Invalid log filter '{directive}': {message}")]
    InvalidFilter { directive: String, message: String },

    /// A global subscriber was installed earlier in this process.
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
