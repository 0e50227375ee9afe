//! Core record types for the fuel-consumption ledger.
//!
//! A vehicle's ledger is the sequence of its [`FuelEvent`] values ordered by
//! [`LedgerPosition`]. Each event stores a derived `average_consumption`
//! describing the interval that ends at that event.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AttachmentId, DriverId, FuelEventId, OrganizationId, VehicleId};

// ---------------------------------------------------------------------------
// Ledger position
// ---------------------------------------------------------------------------

/// Total ordering key of an event inside one vehicle's ledger.
///
/// Events are ordered by `date`, and same-date events by `seq`, the
/// store-assigned insertion counter. Field order matters: the derived
/// [`Ord`] compares `date` first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct LedgerPosition {
    /// Refueling timestamp.
    pub date: DateTime<Utc>,
    /// Insertion counter used to break ties between same-date events.
    pub seq: i64,
}

impl LedgerPosition {
    /// Create a position from a date and a sequence number.
    pub const fn new(date: DateTime<Utc>, seq: i64) -> Self {
        Self { date, seq }
    }

    /// The position after every existing event recorded at `date`.
    ///
    /// A freshly created event receives the highest sequence number in the
    /// store, so this is where it will sort once persisted.
    pub const fn tail_of(date: DateTime<Utc>) -> Self {
        Self { date, seq: i64::MAX }
    }
}

impl core::fmt::Display for LedgerPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}#{}", self.date.to_rfc3339(), self.seq)
    }
}

// ---------------------------------------------------------------------------
// Fuel reading
// ---------------------------------------------------------------------------

/// The two measurements that drive consumption: where the odometer stood
/// and how much fuel went in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuelReading {
    /// Cumulative distance shown on the odometer.
    pub odometer_reading: Decimal,
    /// Fuel volume purchased.
    pub volume: Decimal,
}

// ---------------------------------------------------------------------------
// Fuel event
// ---------------------------------------------------------------------------

/// Optional bookkeeping attached to a refueling.
///
/// None of these fields take part in the consumption calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FuelEventDetails {
    /// Driver who logged the refueling.
    pub driver_id: Option<DriverId>,
    /// Amount paid, in the organization's currency.
    #[ts(as = "Option<String>")]
    pub total_cost: Option<Decimal>,
    /// Free-text station name or location.
    pub station: Option<String>,
    /// Photo of the pump's fuel meter.
    pub fuel_meter_photo: Option<AttachmentId>,
    /// Photo of the vehicle's odometer.
    pub odometer_photo: Option<AttachmentId>,
}

/// One recorded refueling of one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FuelEvent {
    /// Unique event identifier.
    pub id: FuelEventId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Vehicle whose ledger this event belongs to.
    pub vehicle_id: VehicleId,
    /// When the refueling happened.
    pub date: DateTime<Utc>,
    /// Store-assigned insertion counter (tie-breaker for equal dates).
    pub seq: i64,
    /// Cumulative distance at refueling time.
    #[ts(as = "String")]
    pub odometer_reading: Decimal,
    /// Fuel volume purchased.
    #[ts(as = "String")]
    pub volume: Decimal,
    /// Distance per fuel unit since the previous refueling. `None` when
    /// there is no predecessor or the value could not be derived.
    #[ts(as = "Option<String>")]
    pub average_consumption: Option<Decimal>,
    /// Bookkeeping fields outside the consumption calculation.
    pub details: FuelEventDetails,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl FuelEvent {
    /// This event's place in its vehicle's ledger.
    pub const fn position(&self) -> LedgerPosition {
        LedgerPosition::new(self.date, self.seq)
    }

    /// The odometer/volume pair used for consumption.
    pub const fn reading(&self) -> FuelReading {
        FuelReading {
            odometer_reading: self.odometer_reading,
            volume: self.volume,
        }
    }
}
