use thiserror::Error;
use toolwire_core::ErrorCode;

#[derive(Debug, Error)]
pub enum ToolbusError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{0}' is disabled")]
    Disabled(String),

    #[error("Invalid parameters for '{tool}': {message}")]
    InvalidParameters { tool: String, message: String },

    #[error("Tool '{tool}' failed: {message}")]
    ExecutionFailed { tool: String, message: String },
}

impl ToolbusError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ToolbusError::NotFound(_) | ToolbusError::Disabled(_) => ErrorCode::ToolNotFound,
            ToolbusError::InvalidParameters { .. } => ErrorCode::ParameterInvalid,
            ToolbusError::ExecutionFailed { .. } => ErrorCode::ToolExecutionFailed,
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolbusError>;
