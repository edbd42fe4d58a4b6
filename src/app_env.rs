/// URL for accessing the PostgreSQL database (should contain a database name in the path)
pub const DB_URL: &str = "DATABASE_URL";
/// Log level configuration for the application, using [EnvFilter directives](https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Address and port the HTTP server listens on. Defaults to [DEFAULT_BIND_ADDRESS].
pub const BIND_ADDRESS: &str = "BIND_ADDRESS";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// OpenTelemetry span export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_SPAN_EXPORT_URL: &str = "OTEL_SPAN_EXPORT_URL";
/// OpenTelemetry metrics export URL. Should be http://localhost:4317 by default, as the service should
/// have an OpenTelemetry collector sidecar which directs metrics to the correct place
pub const OTEL_METRIC_EXPORT_URL: &str = "OTEL_METRIC_EXPORT_URL";

/// Base URL of the task API, used by the client synchronizer
pub const TASKS_API_URL: &str = "TASKS_API_URL";
/// ID of the user the client synchronizer acts on behalf of
pub const TASKS_USER_ID: &str = "TASKS_USER_ID";
/// File the client synchronizer mirrors its last known state into
pub const TASKS_CACHE_PATH: &str = "TASKS_CACHE_PATH";
