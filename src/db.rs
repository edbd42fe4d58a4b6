use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

/// Opens a connection pool against the PostgreSQL database at [db_url]
pub async fn connect_sqlx(db_url: &str) -> Result<PgPool, anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(2))
        .connect(db_url)
        .await
        .context("connecting to the database")?;

    Ok(pool)
}

/// Brings the database schema up to date with the SQL files under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    info!("Running database migrations");
    sqlx::migrate!()
        .run(pool)
        .await
        .context("applying database migrations")?;
    info!("Database migrations completed");

    Ok(())
}
