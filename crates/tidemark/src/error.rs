//! Error types for migration generation and bookkeeping.

use std::path::PathBuf;

use tidemark_core::error::GenerateError;

/// Errors that can occur while generating, storing or tracking migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Planning failed (unsupported DDL or a failed rename confirmation).
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// The version identifier would be too long.
    #[error("Version '{version}' is {length} characters long (maximum {max}); use a shorter name")]
    VersionLengthExceeded {
        /// The rejected identifier.
        version: String,
        /// Its length.
        length: usize,
        /// The maximum length.
        max: usize,
    },

    /// A migration name that cannot be part of a version identifier.
    #[error("Invalid migration name '{0}': use letters, digits, '_' or '-'")]
    InvalidLabel(String),

    /// A persisted version identifier that cannot be parsed.
    #[error("Invalid version identifier '{0}'")]
    InvalidVersion(String),

    /// An artifact for this version (or sequence number) already exists.
    #[error("Migration version already exists: {0}")]
    VersionExists(PathBuf),

    /// `init` was run on a location that already holds migrations.
    #[error("Migrations already initialized in {0}")]
    AlreadyInitialized(PathBuf),

    /// A migration was requested before `init`.
    #[error("Migrations not initialized in {0}; run `tidemark init` first")]
    NotInitialized(PathBuf),

    /// Database error while reading or writing the history table.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error (reading/writing artifacts or snapshots).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
