//! Tracing subscriber and OpenTelemetry wiring.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::{
    trace::{RandomIdGenerator, Sampler, TracerProvider},
    Resource,
};
use opentelemetry_stdout::SpanExporter;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Settings for [`init_telemetry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Log line format
    pub format: LogFormat,
    /// Also export spans to stdout through OpenTelemetry
    pub otel_stdout: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_filter: "info,fabula=debug".to_string(),
            format: LogFormat::Pretty,
            otel_stdout: false,
        }
    }
}

impl TelemetryConfig {
    /// Raise the default filter to debug for every crate.
    pub fn verbose(mut self) -> Self {
        self.default_filter = "debug".to_string();
        self
    }

    /// Switch to JSON log lines.
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_filter` when set.
///
/// # Errors
///
/// Returns error if a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let fmt_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
    };

    let otel_layer = config.otel_stdout.then(|| {
        let provider = TracerProvider::builder()
            .with_simple_exporter(SpanExporter::default())
            .with_id_generator(RandomIdGenerator::default())
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(Resource::new(vec![KeyValue::new("service.name", "fabula")]))
            .build();
        let tracer = provider.tracer("fabula");
        opentelemetry::global::set_tracer_provider(provider);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending spans before exit.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
