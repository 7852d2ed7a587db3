//! Logging and tracing setup for toolwire binaries.
//!
//! Console output through `tracing-subscriber`, with optional OTLP span
//! export through OpenTelemetry.
//!
//! ```no_run
//! use toolwire_observability::{ObservabilityConfig, init};
//!
//! let config = ObservabilityConfig::new("toolwire-server").with_log_level("debug");
//! init(config)?;
//! tracing::info!("Server starting");
//! # Ok::<(), toolwire_observability::ObservabilityError>(())
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_SERVICE_NAME` - Service name
//! - `OTEL_SERVICE_VERSION` - Service version
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` - OTLP endpoint
//! - `TOOLWIRE_LOG` or `RUST_LOG` - Log filter
//! - `TOOLWIRE_LOG_JSON` - JSON console lines

pub mod config;
pub mod error;
pub mod spans;
pub mod telemetry;

pub use config::ObservabilityConfig;
pub use error::ObservabilityError;
pub use spans::{record_duration, record_error};
pub use telemetry::{build_filter, init, init_from_env, shutdown};
