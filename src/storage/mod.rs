//! SQLite persistence
//!
//! The [`Database`] handle is constructed once at startup and cloned into each
//! service; nothing here is process-global. Storage performs no authorization
//! of its own: every owner-scoped predicate is supplied by the caller.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use thiserror::Error;
use tracing::info;

use crate::types::DateTime;

pub mod categories;
pub mod todos;
pub mod users;

pub use categories::CategoryStorage;
pub use todos::{TodoPageSource, TodoStorage};
pub use users::UserStorage;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Classify a driver error, separating uniqueness violations
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                StorageError::UniqueViolation(db.message().to_string())
            }
            _ => StorageError::Sqlx(err),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Connection pool shared by all storages
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) and migrate the database at `url`
    pub async fn connect(url: &str, max_connections: u32) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        info!("Connected to database at {}", url);
        Ok(db)
    }

    /// Private in-memory database.
    ///
    /// Uses a single long-lived connection: each SQLite memory connection is
    /// its own database.
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn todos(&self) -> TodoStorage {
        TodoStorage::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryStorage {
        CategoryStorage::new(self.pool.clone())
    }

    pub fn users(&self) -> UserStorage {
        UserStorage::new(self.pool.clone())
    }
}

/// Read an epoch-millisecond column as a timestamp
pub(crate) fn timestamp(row: &SqliteRow, column: &str) -> StorageResult<DateTime> {
    let millis: i64 = row.try_get(column)?;
    DateTime::from_millis(millis)
        .ok_or_else(|| StorageError::InvalidData(format!("{} out of range: {}", column, millis)))
}

/// Read a nullable epoch-millisecond column
pub(crate) fn optional_timestamp(
    row: &SqliteRow,
    column: &str,
) -> StorageResult<Option<DateTime>> {
    let millis: Option<i64> = row.try_get(column)?;
    millis
        .map(|m| {
            DateTime::from_millis(m)
                .ok_or_else(|| StorageError::InvalidData(format!("{} out of range: {}", column, m)))
        })
        .transpose()
}
