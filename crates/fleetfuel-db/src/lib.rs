//! `PostgreSQL` persistence for the fuel-consumption ledger.
//!
//! The ledger engine in `fleetfuel-ledger` is written against the
//! [`EventStore`](fleetfuel_ledger::EventStore) and
//! [`UnitOfWork`](fleetfuel_ledger::UnitOfWork) traits. This crate provides
//! the production implementation of both on top of [`sqlx`].
//!
//! # Architecture
//!
//! ```text
//! LedgerMaintainer
//!     |
//!     +-- begin() ---------> FuelEventStore (borrowed PgPool)
//!         |
//!         +-- PgUnit ------> one PostgreSQL transaction
//!             |-- pg_advisory_xact_lock(vehicle)
//!             |-- neighbor SELECTs on (date, seq)
//!             +-- INSERT / UPDATE / DELETE fuel_events
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`fuel_event_store`] -- The `fuel_events` table as a ledger store
//! - [`error`] -- Shared error types

pub mod error;
pub mod fuel_event_store;
pub mod postgres;

// Re-export primary types for convenience.
pub use error::DbError;
pub use fuel_event_store::{FuelEventRow, FuelEventStore, PgUnit};
pub use postgres::{PostgresConfig, PostgresPool};
