//! Database layer for Confer
//!
//! Provides durable persistence for conversation checkpoints and
//! content-addressed file summaries.

pub mod error;
pub mod models;
pub mod repos;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use error::{Error, Result};
pub use models::{CheckpointRecord, FileSummaryRecord};
pub use repos::{checkpoints::CheckpointsRepo, file_summaries::FileSummariesRepo};

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Create a new database connection from a file path
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Io(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        Self::open(options).await
    }

    /// Connect using a durable-store address
    ///
    /// Accepts either a `sqlite:` URL or a plain filesystem path. Any other
    /// scheme (e.g. `postgres://`) is rejected so callers can fall back.
    pub async fn connect(address: &str) -> Result<Self> {
        let address = address.trim();

        if address.starts_with("sqlite:") {
            let options = SqliteConnectOptions::from_str(address)?.create_if_missing(true);
            return Self::open(options).await;
        }

        if address.is_empty() || address.contains("://") {
            return Err(Error::UnsupportedAddress(address.to_string()));
        }

        Self::new(address).await
    }

    async fn open(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        tracing::debug!("Database migrations applied");

        Ok(Self { pool })
    }

    /// Get the default database path (~/.cache/confer/confer.db)
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Io("Could not determine cache directory".to_string()))?;
        Ok(cache_dir.join("confer").join("confer.db"))
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the checkpoints repository
    pub fn checkpoints(&self) -> CheckpointsRepo {
        CheckpointsRepo::new(self.pool.clone())
    }

    /// Get the file summaries repository
    pub fn file_summaries(&self) -> FileSummariesRepo {
        FileSummariesRepo::new(self.pool.clone())
    }
}
