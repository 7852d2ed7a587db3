//! Configuration for logging and trace export

use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVICE_NAME: &str = "toolwire";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name attached to exported traces (e.g. "toolwire-server")
    pub service_name: String,

    pub service_version: Option<String>,

    /// OTLP gRPC endpoint (e.g. "http://localhost:4317"). Console only when unset.
    pub otlp_endpoint: Option<String>,

    pub enable_console: bool,

    /// `EnvFilter` directive such as "info" or "toolwire_server=debug".
    /// Falls back to `RUST_LOG`, then [`DEFAULT_LOG_LEVEL`].
    pub log_level: Option<String>,

    /// Emit console lines as JSON objects instead of the human format.
    pub json: bool,

    pub resource_attributes: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: None,
            otlp_endpoint: None,
            enable_console: true,
            log_level: None,
            json: false,
            resource_attributes: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_console(mut self, enable: bool) -> Self {
        self.enable_console = enable;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.resource_attributes.push((key.into(), value.into()));
        self
    }

    /// Build from environment variables
    ///
    /// Reads:
    /// - `OTEL_SERVICE_NAME` → service_name
    /// - `OTEL_SERVICE_VERSION` → service_version
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT` → otlp_endpoint
    /// - `TOOLWIRE_LOG` or `RUST_LOG` → log_level
    /// - `TOOLWIRE_LOG_JSON` (`1` or `true`) → json
    pub fn from_env() -> Self {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());

        let service_version = std::env::var("OTEL_SERVICE_VERSION").ok();

        // OTLP only when explicitly set, so a missing collector does not spam errors.
        let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let log_level = std::env::var("TOOLWIRE_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();

        let json = std::env::var("TOOLWIRE_LOG_JSON")
            .map(|v| matches!(v.as_str(), "1" | "true"))
            .unwrap_or(false);

        Self {
            service_name,
            service_version,
            otlp_endpoint,
            log_level,
            json,
            ..Default::default()
        }
    }

    /// Effective filter directive.
    pub fn filter_directive(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}
