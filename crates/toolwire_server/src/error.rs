use thiserror::Error;
use toolwire_core::ErrorCode;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServerError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::InitializationFailed
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
