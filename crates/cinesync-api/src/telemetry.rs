//! Tracing subscriber setup.
//!
//! Logs are emitted as JSON, filtered by `RUST_LOG` (default `info`). When
//! `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over OTLP.

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Tracer name reported to the OTLP collector.
const TRACER_NAME: &str = "cinesync-api";

/// Installs the global tracing subscriber.
pub fn init_tracing() {
    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let base = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json());

    let Some(endpoint) = otlp_endpoint else {
        base.init();
        return;
    };

    match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()
    {
        Ok(exporter) => {
            let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .build();
            let tracer = provider.tracer(TRACER_NAME);
            global::set_tracer_provider(provider);

            base.with(tracing_opentelemetry::layer().with_tracer(tracer))
                .init();
            info!(endpoint = %endpoint, "otlp tracing enabled");
        }
        Err(e) => {
            base.init();
            warn!(error = %e, "failed to initialize otlp tracing");
        }
    }
}
