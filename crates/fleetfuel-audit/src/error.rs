//! Error types for the audit binary.

/// Top-level error for the audit binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// Connecting to or migrating the database failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: fleetfuel_db::DbError,
    },

    /// Auditing or repairing the ledger failed.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: fleetfuel_ledger::LedgerError,
    },
}
