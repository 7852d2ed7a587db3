//! Server side of toolwire: accepts TCP connections, enforces the
//! connection ceiling and answers `PING`, `LIST_TOOLS` and `TOOL_CALL`
//! envelopes from a [`ToolRegistry`](toolwire_toolbus::ToolRegistry).

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod server;

pub use config::{ConfigError, ServerConfig};
pub use connection::{ConnectionId, ConnectionTracker};
pub use dispatch::Dispatcher;
pub use error::{Result, ServerError};
pub use server::{ServerEvent, ToolServer};
