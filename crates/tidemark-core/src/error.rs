//! Error types for diffing and DDL rendering.

use crate::dialect::Capability;

/// Boxed error returned by a [`RenameOracle`](crate::rename::RenameOracle).
pub type OracleError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort the generation of a migration.
///
/// Diffing itself cannot fail on well-formed descriptors; every variant
/// originates from rendering SQL or from the rename oracle.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The selected dialect cannot perform the requested DDL action.
    #[error("{capability} is not supported by the {dialect} dialect")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// The rejected capability.
        capability: Capability,
    },

    /// The rename oracle failed to answer.
    #[error("Rename confirmation for {table}.{old} -> {table}.{new} failed: {source}")]
    Oracle {
        /// Table owning both fields.
        table: String,
        /// Field name in the baseline model.
        old: String,
        /// Field name in the current model.
        new: String,
        /// Underlying oracle error.
        #[source]
        source: OracleError,
    },
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenerateError>;
