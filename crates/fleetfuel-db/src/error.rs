//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors. Inside a ledger unit of work they surface to the
//! maintainer as [`StoreError::Backend`], which aborts the transaction.

use fleetfuel_ledger::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

/// Wrap a raw driver error as a ledger store failure.
pub(crate) fn backend(err: sqlx::Error) -> StoreError {
    DbError::Postgres(err).into()
}
