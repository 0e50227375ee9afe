//! Command payloads that flow into the ledger maintainer and down to the
//! event store.
//!
//! The request layer validates presence and format of these fields before
//! they reach the ledger; nothing here re-validates them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{FuelEventId, OrganizationId, VehicleId};
use crate::structs::FuelEventDetails;

/// Log a new refueling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewFuelEvent {
    /// Vehicle that was refueled.
    pub vehicle_id: VehicleId,
    /// When the refueling happened.
    pub date: DateTime<Utc>,
    /// Odometer at refueling time.
    #[ts(as = "String")]
    pub odometer_reading: Decimal,
    /// Fuel volume purchased.
    #[ts(as = "String")]
    pub volume: Decimal,
    /// Optional bookkeeping fields.
    #[serde(default)]
    pub details: FuelEventDetails,
}

/// Correct an existing refueling.
///
/// `vehicle_id` may differ from the stored vehicle, in which case the event
/// is moved to the other vehicle's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct UpdateFuelEvent {
    /// Event being corrected.
    pub id: FuelEventId,
    /// Vehicle the event belongs to after the correction.
    pub vehicle_id: VehicleId,
    /// Corrected refueling time.
    pub date: DateTime<Utc>,
    /// Corrected odometer.
    #[ts(as = "String")]
    pub odometer_reading: Decimal,
    /// Corrected volume.
    #[ts(as = "String")]
    pub volume: Decimal,
    /// Corrected bookkeeping fields.
    #[serde(default)]
    pub details: FuelEventDetails,
}

/// Fields handed to the store when inserting an event. The store assigns
/// `id`, `seq` and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuelEventDraft {
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Vehicle ledger.
    pub vehicle_id: VehicleId,
    /// Refueling time.
    pub date: DateTime<Utc>,
    /// Odometer at refueling time.
    pub odometer_reading: Decimal,
    /// Fuel volume purchased.
    pub volume: Decimal,
    /// Derived consumption computed before insertion.
    pub average_consumption: Option<Decimal>,
    /// Bookkeeping fields.
    pub details: FuelEventDetails,
}

/// Replacement values for every mutable column of a stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuelEventChanges {
    /// Vehicle ledger.
    pub vehicle_id: VehicleId,
    /// Refueling time.
    pub date: DateTime<Utc>,
    /// Odometer at refueling time.
    pub odometer_reading: Decimal,
    /// Fuel volume purchased.
    pub volume: Decimal,
    /// Derived consumption recomputed for the new values.
    pub average_consumption: Option<Decimal>,
    /// Bookkeeping fields.
    pub details: FuelEventDetails,
}
