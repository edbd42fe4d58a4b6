use crate::app_env;
use anyhow::Context;
use axum::Router;
use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use opentelemetry_sdk::{Resource, runtime};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing::{Span, debug, debug_span, field};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer, OpenTelemetrySpanExt};
use tracing_subscriber::{EnvFilter, prelude::*, registry};

/// The name of the service as it should appear in OpenTelemetry collectors
const SERVICE_NAME: &str = "task-streaks";

/// Struct containing OpenTelemetry primitives which export data to a tracing server
pub struct OtelExporters {
    pub tracer: Tracer,
    pub meter: SdkMeterProvider,
}

/// Wraps every request in a span parented on the caller's W3C trace context. The span is
/// labelled with the route template (`/users/:user_id/tasks`) rather than the concrete path so
/// per-user URLs don't fan out into separate span names.
pub fn attach_tracing_http<T>(router: Router<T>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let route = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or("unmatched");
                    let req_span = debug_span!(
                        "request",
                        method = request.method().as_str(),
                        route,
                        path = request.uri().path(),
                        response_status = field::Empty,
                    );

                    req_span.set_parent(global::get_text_map_propagator(|propagator| {
                        propagator.extract(&HeaderExtractor(request.headers()))
                    }));

                    req_span
                })
                .on_response(
                    |response: &Response<Body>, latency: Duration, span: &Span| {
                        span.record("response_status", field::display(response.status()));
                        debug!(latency_ms = latency.as_millis() as u64, "request processing complete");
                    },
                ),
        ),
    )
}

/// Instantiates OpenTelemetry exporters which run in the background and send tracing/logging/metrics
/// data to an opentelemetry-compatible gRPC endpoint (typically http://localhost:4317 with a standard
/// sidecar setup)
pub fn init_exporters(
    otlp_traces_endpoint: &str,
    otlp_metrics_endpoint: &str,
) -> Result<OtelExporters, anyhow::Error> {
    let span_export = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_traces_endpoint)
        .build()
        .context("building span exporter")?;
    let meter_export = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_metrics_endpoint)
        .build()
        .context("building meter exporter")?;

    let metrics_reader = PeriodicReader::builder(meter_export, runtime::Tokio).build();

    let trace_provider = opentelemetry_sdk::trace::TracerProvider::builder()
        .with_batch_exporter(span_export, runtime::Tokio)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build()
        .tracer(SERVICE_NAME);
    let meter_provider = SdkMeterProvider::builder()
        .with_reader(metrics_reader)
        .with_resource(Resource::new([KeyValue::new("service.name", SERVICE_NAME)]))
        .build();

    Ok(OtelExporters {
        tracer: trace_provider,
        meter: meter_provider,
    })
}

/// Constructs a filter which uses [app_env::LOG_LEVEL] to configure per-module logging. Filters
/// to the "info" level by default.
pub fn init_env_filter() -> Result<EnvFilter, anyhow::Error> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(app_env::LOG_LEVEL)
        .from_env()
        .context("reading log filter directives")
}

/// Sets up the global logging and tracing sinks. Everything at "debug" and above goes to the
/// OpenTelemetry exporters when they're configured, while [env_filter] only governs the JSON
/// log lines printed to stdout.
pub fn setup_logging_and_tracing(env_filter: EnvFilter, otel_exporters: Option<OtelExporters>) {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let (span_layer, metrics_layer) = match otel_exporters {
        Some(exporters) => (
            Some(OpenTelemetryLayer::new(exporters.tracer)),
            Some(MetricsLayer::new(exporters.meter)),
        ),
        None => (None, None),
    };

    registry()
        .with(LevelFilter::DEBUG)
        .with(span_layer)
        .with(metrics_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_filter(env_filter),
        )
        .init();
}
