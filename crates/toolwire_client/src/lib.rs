//! Client side of toolwire.
//!
//! ```no_run
//! use serde_json::json;
//! use toolwire_client::{ClientConfig, ToolClient};
//!
//! # async fn run() -> toolwire_client::Result<()> {
//! let client = ToolClient::new(ClientConfig::new("tcp://127.0.0.1:8080"));
//! client.connect().await?;
//! let outcome = client.call_tool("echo", json!({"v": "hello"})).await?;
//! assert!(outcome.success);
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
mod pending;

pub use client::{ClientEvent, ConnectionState, ToolClient};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
