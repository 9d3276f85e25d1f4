use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Applies pending migrations from `./migrations`.
pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}
