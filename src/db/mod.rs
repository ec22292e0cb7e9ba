//! Database Module
//!
//! Handles the SQLite connection pools and migrations.
//!
//! Two pools share one database file: a read pool with several connections
//! and a write pool capped at a single connection. Every compound mutation
//! (order + items + stock + ledger rows) runs in one transaction on the
//! write pool, so write transactions are serialized and a stock-sufficiency
//! check inside a transaction cannot race another writer.

pub mod models;
#[cfg(test)]
pub(crate) mod testutil;

use crate::utils::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

/// Database service owning the SQLite connection pools
#[derive(Clone, Debug)]
pub struct DbService {
    read: SqlitePool,
    write: SqlitePool,
}

impl DbService {
    /// Open the database at `db_path` with WAL mode and run migrations
    pub async fn open(db_path: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AppError::database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON")
            // Wait up to 5s on write contention instead of failing immediately
            .pragma("busy_timeout", "5000");

        let write = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        let read = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        Self::migrate(&write).await?;

        Ok(Self { read, write })
    }

    /// Open an in-memory database, used by tests
    ///
    /// A single connection backs both pools: an in-memory SQLite database
    /// exists per connection, so the pool must never grow past one.
    pub async fn open_in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::database(e.to_string()))?
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory database: {e}")))?;

        Self::migrate(&pool).await?;

        Ok(Self {
            read: pool.clone(),
            write: pool,
        })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply migrations: {e}")))?;
        tracing::debug!("Database migrations applied");
        Ok(())
    }

    /// Pool for read-only queries
    pub fn read(&self) -> &SqlitePool {
        &self.read
    }

    /// Pool for writes and transactions (single connection)
    pub fn write(&self) -> &SqlitePool {
        &self.write
    }
}
