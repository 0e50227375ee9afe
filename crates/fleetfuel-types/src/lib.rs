//! Shared type definitions for the `FleetFuel` consumption ledger.
//!
//! This crate is the single source of truth for the records exchanged
//! between the ledger engine, the persistence layer and the request layer.
//! Types flow downstream to `TypeScript` via `ts-rs` for the fleet
//! dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`structs`] -- The [`FuelEvent`] record and its [`LedgerPosition`]
//! - [`commands`] -- Create/update payloads and store-facing drafts

pub mod commands;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use commands::{FuelEventChanges, FuelEventDraft, NewFuelEvent, UpdateFuelEvent};
pub use ids::{AttachmentId, DriverId, FuelEventId, OrganizationId, VehicleId};
pub use structs::{FuelEvent, FuelEventDetails, FuelReading, LedgerPosition};
