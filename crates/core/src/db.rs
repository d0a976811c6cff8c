//! Database pool construction and schema migrations.
//!
//! The schema lives in `crates/core/migrations/` and is embedded at compile time.

use crate::ClinicResult;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Default database location when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://clinica.db?mode=rwc";

const MAX_CONNECTIONS: u32 = 8;

/// Opens a pool for `database_url`, creating the database file if needed.
///
/// Foreign keys are enforced on every connection.
pub async fn connect(database_url: &str) -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    tracing::debug!(database_url, "database pool opened");
    Ok(pool)
}

/// Applies any pending migrations.
pub async fn migrate(pool: &SqlitePool) -> ClinicResult<()> {
    MIGRATOR.run(pool).await?;
    tracing::info!("database schema is up to date");
    Ok(())
}

/// A migrated in-memory database, for tests and throwaway tooling.
///
/// The pool holds exactly one connection that never expires: an in-memory SQLite
/// database lives only as long as its connection.
pub async fn connect_in_memory() -> ClinicResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_has_the_schema() {
        let pool = connect_in_memory().await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in [
            "appointment_services",
            "appointments",
            "patients",
            "professional_services",
            "professionals",
            "services",
            "sessions",
            "users",
        ] {
            assert!(names.contains(&expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let pool = connect_in_memory().await.unwrap();
        let err = sqlx::query(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) \
             VALUES ('x', 999, '', '')",
        )
        .execute(&pool)
        .await
        .unwrap_err();
        let db_err = err.as_database_error().expect("database error");
        assert!(db_err.is_foreign_key_violation());
    }
}
