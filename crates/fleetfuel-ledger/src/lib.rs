//! Fuel-consumption ledger maintenance.
//!
//! Every vehicle owns a chronologically ordered sequence of refuelings.
//! Each refueling stores a derived average consumption: distance since the
//! previous refueling divided by the fuel volume put in. This crate keeps
//! that derived value consistent whenever a refueling is inserted, edited,
//! re-dated, moved to another vehicle or deleted, anywhere in time.
//!
//! # Architecture
//!
//! - [`consumption`] -- Pure rate arithmetic, clamping and outlier threshold.
//! - [`neighbors`] -- The [`NeighborLocator`]: predecessor/successor lookups.
//! - [`maintainer`] -- The [`LedgerMaintainer`]: create/update/delete/audit.
//! - [`store`] -- The [`EventStore`]/[`UnitOfWork`] persistence contract.
//! - [`memory`] -- [`MemoryEventStore`], an in-memory store.
//! - [`audit`] -- Offline whole-ledger verification.
//!
//! # Derivation
//!
//! For event E with chronological predecessor P:
//!
//! ```text
//! E.rate = clamp0((E.odometer - P.odometer) / E.volume)   if < 1000
//! E.rate = absent                                          otherwise, or
//!                                                          when P is absent
//!                                                          or E.volume <= 0
//! ```
//!
//! Data anomalies never fail an operation. Store failures abort the whole
//! unit of work.
//!
//! # Usage
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use fleetfuel_ledger::{LedgerMaintainer, MemoryEventStore};
//! use fleetfuel_types::{FuelEventDetails, NewFuelEvent, OrganizationId, VehicleId};
//! use rust_decimal::Decimal;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let org = OrganizationId::new();
//! let vehicle = VehicleId::new();
//! let jan_1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().ok_or("date")?;
//! let jan_10 = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).single().ok_or("date")?;
//! let maintainer = LedgerMaintainer::new(MemoryEventStore::new());
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build()?;
//! let second = runtime.block_on(async {
//!     maintainer
//!         .create_event(org, NewFuelEvent {
//!             vehicle_id: vehicle,
//!             date: jan_1,
//!             odometer_reading: Decimal::new(1000, 0),
//!             volume: Decimal::new(40, 0),
//!             details: FuelEventDetails::default(),
//!         })
//!         .await?;
//!     maintainer
//!         .create_event(org, NewFuelEvent {
//!             vehicle_id: vehicle,
//!             date: jan_10,
//!             odometer_reading: Decimal::new(1400, 0),
//!             volume: Decimal::new(40, 0),
//!             details: FuelEventDetails::default(),
//!         })
//!         .await
//! })?;
//!
//! assert_eq!(second.event.average_consumption, Some(Decimal::new(10, 0)));
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod consumption;
pub mod maintainer;
pub mod memory;
pub mod neighbors;
pub mod store;

// Re-export primary types at crate root.
pub use audit::{AuditResult, RateDrift};
pub use consumption::{OUTLIER_THRESHOLD, compute_rate, derive_consumption};
pub use maintainer::{LedgerMaintainer, LedgerOutcome, NeighborRewrite};
pub use memory::{MemoryEventStore, MemoryUnit};
pub use neighbors::NeighborLocator;
pub use store::{Direction, EventStore, NeighborQuery, UnitOfWork};

use fleetfuel_types::FuelEventId;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors reported by an [`EventStore`] or [`UnitOfWork`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write targeted an event that does not exist.
    #[error("fuel event not found: {0}")]
    NotFound(FuelEventId),

    /// The storage backend failed.
    #[error("event store backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

/// Errors that abort a ledger operation.
///
/// Nothing written inside the aborted unit of work survives.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The event to update or delete does not exist in this organization.
    #[error("fuel event {0} not found")]
    EventNotFound(FuelEventId),

    /// A read or write inside the unit of work failed.
    #[error("ledger persistence failure: {0}")]
    Persistence(#[from] StoreError),
}
