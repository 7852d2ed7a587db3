//! Subscriber setup: env filter, console output and optional OTLP export.

use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ObservabilityConfig;
use crate::error::ObservabilityError;

static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

pub fn build_filter(config: &ObservabilityConfig) -> Result<EnvFilter, ObservabilityError> {
    let directive = config.filter_directive();
    EnvFilter::try_new(directive).map_err(|e| ObservabilityError::InvalidFilter {
        directive: directive.to_string(),
        message: e.to_string(),
    })
}

/// Installs the global subscriber.
///
/// Console output goes to stderr so command output on stdout stays
/// machine-readable. A failing OTLP exporter degrades to console only.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    let env_filter = build_filter(&config)?;

    let mut attributes = vec![KeyValue::new("service.name", config.service_name.clone())];
    if let Some(version) = &config.service_version {
        attributes.push(KeyValue::new("service.version", version.clone()));
    }
    for (key, value) in &config.resource_attributes {
        attributes.push(KeyValue::new(key.clone(), value.clone()));
    }
    let resource = Resource::builder().with_attributes(attributes).build();

    let text_layer = (config.enable_console && !config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let json_layer = (config.enable_console && config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });

    let mut otlp_failure = None;
    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => match build_otlp_tracer_provider(&config.service_name, endpoint, resource) {
            Ok((tracer, provider)) => {
                global::set_tracer_provider(provider.clone());
                let _ = TRACER_PROVIDER.set(provider);
                Some(OpenTelemetryLayer::new(tracer))
            }
            Err(e) => {
                otlp_failure = Some(e);
                None
            }
        },
        None => None,
    };
    let otlp_enabled = otel_layer.is_some();

    Registry::default()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|_| ObservabilityError::AlreadyInitialized)?;

    if let Some(e) = otlp_failure {
        tracing::warn!(
            service.name = %config.service_name,
            error = %e,
            "Failed to initialize OTLP export, falling back to console-only tracing"
        );
    } else if otlp_enabled {
        tracing::info!(service.name = %config.service_name, "OTLP tracing enabled");
    } else {
        tracing::debug!(service.name = %config.service_name, "Tracing initialized (console only)");
    }

    Ok(())
}

fn build_otlp_tracer_provider(
    service_name: &str,
    endpoint: &str,
    resource: Resource,
) -> Result<(SdkTracer, SdkTracerProvider), ObservabilityError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.to_string())
        .build()
        .map_err(|e| ObservabilityError::InitFailed(e.to_string()))?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(service_name.to_string());
    Ok((tracer, provider))
}

/// Flushes and shuts down the OTLP exporter, if one was started.
pub fn shutdown() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        let _ = provider.shutdown();
        tracing::debug!("OpenTelemetry tracer provider shut down");
    }
}

pub fn init_from_env() -> Result<(), ObservabilityError> {
    init(ObservabilityConfig::from_env())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_targets() {
        let config = ObservabilityConfig::default().with_log_level("warn,toolwire_server=debug");
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let config = ObservabilityConfig::default().with_log_level("toolwire=loud");
        let err = build_filter(&config).unwrap_err();
        assert!(matches!(err, ObservabilityError::InvalidFilter { .. }));
    }

    #[test]
    fn test_second_init_fails() {
        let config = ObservabilityConfig::default().with_console(false);
        let _ = init(config.clone());
        assert!(matches!(init(config), Err(ObservabilityError::AlreadyInitialized)));
    }
}
