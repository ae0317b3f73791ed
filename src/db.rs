//! Database module
//!
//! Database connection and migration utilities.

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};

use crate::config::Config;
use crate::error::AppError;

/// Initial schema, applied idempotently
const MIGRATION_0001_INIT: &str = include_str!("../migrations/0001_init.sql");

const REQUIRED_TABLES: &[&str] = &["users", "accounts", "transactions"];

/// Open a connection pool using the configured URL
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(crate::config::ConfigError::MissingEnv("DATABASE_URL"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(url)
        .await
        .map_err(crate::storage::StorageError::from)?;

    Ok(pool)
}

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Apply the bundled schema. Every statement is `IF NOT EXISTS`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Plain &str goes over the simple query protocol, which allows
    // several statements in one call
    pool.execute(MIGRATION_0001_INIT).await?;

    tracing::info!("Database schema is up to date");
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(*table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}
