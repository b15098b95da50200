//! Migration history tracking.
//!
//! This module manages the `tidemark` table recording which versions have
//! been applied to a database, one row per `(app, version)` pair.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::Result;
use crate::version::{VersionId, VersionSource};

/// SQL to create the history table (SQLite).
pub const CREATE_HISTORY_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tidemark (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    app VARCHAR(100) NOT NULL,
    version VARCHAR(255) NOT NULL,
    UNIQUE(app, version)
)
"#;

/// Manages the migration history in the database.
#[derive(Debug, Clone)]
pub struct MigrationHistory {
    pool: SqlitePool,
}

impl MigrationHistory {
    /// Creates a history accessor over an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url` and ensures the history table exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        let history = Self::new(pool);
        history.ensure_table().await?;
        Ok(history)
    }

    /// Ensures the history table exists.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(CREATE_HISTORY_TABLE_SQL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Records a version as applied.
    pub async fn record(&self, app: &str, version: &VersionId) -> Result<()> {
        sqlx::query("INSERT INTO tidemark (app, version) VALUES (?, ?)")
            .bind(app)
            .bind(version.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Checks if a version has been applied.
    pub async fn is_applied(&self, app: &str, version: &VersionId) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM tidemark WHERE app = ? AND version = ?")
                .bind(app)
                .bind(version.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Gets the applied versions of an app, sorted by sequence number.
    pub async fn applied(&self, app: &str) -> Result<Vec<VersionId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT version FROM tidemark WHERE app = ? ORDER BY id")
                .bind(app)
                .fetch_all(&self.pool)
                .await?;

        let mut versions = rows
            .into_iter()
            .map(|(version,)| version.parse::<VersionId>())
            .collect::<Result<Vec<_>>>()?;
        versions.sort();
        Ok(versions)
    }
}

impl VersionSource for MigrationHistory {
    async fn last_version(&self, app: &str) -> Result<Option<VersionId>> {
        Ok(self.applied(app).await?.pop())
    }
}
