//! Connection pool setup
//!
//! Builds the SQLite pool from configuration. File-backed databases run in
//! WAL mode with relaxed synchronous writes; foreign key enforcement is
//! always on since the schema relies on cascading deletes.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;

/// Create a connection pool from the database configuration.
///
/// For file-backed databases the parent directory is created if missing and
/// the database file itself is created on first connect.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    if is_memory_url(&config.url) {
        // Every connection to :memory: is a distinct database, so the pool
        // must never hand out more than one.
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("invalid in-memory database URL")?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .context("failed to open in-memory database")?;
        tracing::info!("connected to in-memory SQLite database");
        return Ok(pool);
    }

    let path = config.url.trim_start_matches("sqlite:");
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory {parent:?}"))?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))
        .with_context(|| format!("invalid database path: {path}"))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database at {path}"))?;

    tracing::info!(path, "connected to SQLite database");
    Ok(pool)
}

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Create an in-memory pool for tests.
#[doc(hidden)]
pub async fn create_test_pool() -> Result<SqlitePool> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    create_pool(&config).await
}
