//! Database module
//!
//! Database connection and schema utilities. The schema itself lives in raw
//! SQL files under `migrations/`.

use sqlx::{Executor, PgPool};

/// Tables the ledger store reads and writes
const REQUIRED_TABLES: [&str; 2] = ["accounts", "bills"];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

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
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Apply `migrations/0001_init.sql`; every statement is idempotent
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("../migrations/0001_init.sql")).await?;

    Ok(())
}
