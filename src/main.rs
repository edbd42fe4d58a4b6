use anyhow::Context;
use dotenv::dotenv;
use std::env;
use std::sync::Arc;
use task_streaks::{SharedData, app_env, build_router, db, logging, persistence};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    dotenv().ok();

    let otel_exporters = match (
        env::var(app_env::OTEL_SPAN_EXPORT_URL),
        env::var(app_env::OTEL_METRIC_EXPORT_URL),
    ) {
        (Ok(span_url), Ok(metric_url)) => Some(logging::init_exporters(&span_url, &metric_url)?),
        _ => None,
    };
    logging::setup_logging_and_tracing(logging::init_env_filter()?, otel_exporters);

    let db_url = env::var(app_env::DB_URL)
        .with_context(|| format!("{} must be set to reach the database", app_env::DB_URL))?;
    let pool = db::connect_sqlx(&db_url).await?;
    db::run_migrations(&pool).await?;

    let shared_data = Arc::new(SharedData {
        ext_cxn: persistence::ExternalConnectivity::new(pool),
    });
    let router = build_router(shared_data);

    let bind_address =
        env::var(app_env::BIND_ADDRESS).unwrap_or_else(|_| app_env::DEFAULT_BIND_ADDRESS.to_owned());
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding to {bind_address}"))?;

    info!("Starting server on {bind_address}.");
    axum::serve(listener, router)
        .await
        .context("serving HTTP requests")
}
