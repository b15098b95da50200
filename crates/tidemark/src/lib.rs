//! Versioned schema migrations generated from model snapshots.
//!
//! `tidemark` drives [`tidemark_core`] for one application at a time:
//! - `init` writes version 0 from an empty baseline
//! - `migrate` diffs the current models against the stored baseline and
//!   writes the next version, asking about renames through an oracle
//! - Applied versions can be tracked in a SQLite history table
//!
//! # Layout
//!
//! ```text
//! {location}/{app}/
//!     0_20240309100000_init.json
//!     1_20240310083012_add_email.json
//!     old_models.json
//! ```
//!
//! Each artifact holds `upgrade` and `downgrade` statement lists.
//!
//! # CLI Usage
//!
//! ```bash
//! # Write the first migration
//! tidemark --models models.json init
//!
//! # Write the next migration
//! tidemark --models models.json migrate --name add_email
//!
//! # Print the SQL without writing anything
//! tidemark --models models.json migrate --dry-run
//!
//! # List versions
//! tidemark history
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod history;
pub mod oracle;
pub mod store;
pub mod version;

pub use tidemark_core;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{Settings, DEFAULT_CONFIG_FILE};
    pub use crate::error::{MigrateError, Result};
    pub use crate::generator::{GeneratedMigration, MigrationGenerator};
    pub use crate::history::MigrationHistory;
    pub use crate::oracle::PromptOracle;
    pub use crate::store::{ArtifactStore, MigrationArtifact, BASELINE_FILE};
    pub use crate::version::{next_version, VersionId, VersionSource, MAX_VERSION_LENGTH};
}
