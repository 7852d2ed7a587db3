//! Server configuration.
//!
//! Built programmatically, from `TOOLWIRE_*` environment variables, or from
//! a TOML file:
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 8080
//! max_connections = 100
//! tools = ["echo", "delay"]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// `0` binds an ephemeral port.
    pub port: u16,
    /// Connections beyond this count are rejected at accept time.
    pub max_connections: usize,
    /// Built-in tool names registered on every start.
    pub tools: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_connections: 100,
            tools: vec!["echo".to_string(), "delay".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides defaults from `TOOLWIRE_HOST`, `TOOLWIRE_PORT`,
    /// `TOOLWIRE_MAX_CONNECTIONS` and `TOOLWIRE_TOOLS` (comma separated).
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    pub fn merge_env(mut self) -> Self {
        if let Ok(host) = std::env::var("TOOLWIRE_HOST") {
            self.host = host;
        }

        if let Ok(port) = std::env::var("TOOLWIRE_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                self.port = val;
            }
        }

        if let Ok(max) = std::env::var("TOOLWIRE_MAX_CONNECTIONS") {
            if let Ok(val) = max.parse::<usize>() {
                self.max_connections = val;
            }
        }

        if let Ok(tools) = std::env::var("TOOLWIRE_TOOLS") {
            self.tools = parse_tool_list(&tools);
        }

        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Splits a comma separated list, dropping blanks.
pub fn parse_tool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
