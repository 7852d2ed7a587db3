use thiserror::Error;

#[derive(Debug, Error)]
pub enum BashError {
    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Failed to spawn command: {0}")]
    SpawnFailed(String),

    #[error("UTF-8 decode error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),
}
