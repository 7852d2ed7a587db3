use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_SERVER_URL: &str = "tcp://127.0.0.1:8080";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid server URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported scheme '{0}', expected tcp://")]
    UnsupportedScheme(String),

    #[error("Server URL '{0}' must include a host and port")]
    MissingAddress(String),
}

/// Client connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `tcp://host:port`
    pub server_url: String,
    /// Per-request deadline; also bounds each dial.
    pub timeout: Duration,
    /// Fixed wait between reconnect attempts.
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub heartbeat_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Reads `TOOLWIRE_SERVER_URL`, `TOOLWIRE_TIMEOUT_MS`,
    /// `TOOLWIRE_RECONNECT_DELAY_MS`, `TOOLWIRE_MAX_RECONNECT_ATTEMPTS` and
    /// `TOOLWIRE_HEARTBEAT_INTERVAL_MS`. Unset or unparseable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TOOLWIRE_SERVER_URL") {
            config.server_url = url;
        }
        if let Some(ms) = env_millis("TOOLWIRE_TIMEOUT_MS") {
            config.timeout = ms;
        }
        if let Some(ms) = env_millis("TOOLWIRE_RECONNECT_DELAY_MS") {
            config.reconnect_delay = ms;
        }
        if let Ok(val) = std::env::var("TOOLWIRE_MAX_RECONNECT_ATTEMPTS") {
            if let Ok(attempts) = val.parse::<u32>() {
                config.max_reconnect_attempts = attempts;
            }
        }
        if let Some(ms) = env_millis("TOOLWIRE_HEARTBEAT_INTERVAL_MS") {
            config.heartbeat_interval = ms;
        }

        config
    }

    /// Resolves `server_url` to a `host:port` string for dialing.
    pub fn socket_address(&self) -> Result<String, ConfigError> {
        let url = Url::parse(&self.server_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.server_url.clone(),
            source,
        })?;

        if url.scheme() != "tcp" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        match (url.host_str(), url.port()) {
            (Some(host), Some(port)) if !host.is_empty() => Ok(format!("{host}:{port}")),
            _ => Err(ConfigError::MissingAddress(self.server_url.clone())),
        }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}
