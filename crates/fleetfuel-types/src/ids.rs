//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity the fuel ledger touches has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.
//!
//! Fuel event ids are generated app-side at creation; organization, vehicle
//! and driver ids are owned by the surrounding fleet-management system and
//! only ever flow in through [`From<Uuid>`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Tenant that owns vehicles and their fuel ledgers.
    OrganizationId
}

define_id! {
    /// Vehicle whose refuelings form one ledger.
    VehicleId
}

define_id! {
    /// Unique identifier for one recorded refueling.
    FuelEventId
}

define_id! {
    /// Driver who performed the refueling.
    DriverId
}

define_id! {
    /// Opaque handle to an uploaded file (fuel-meter or odometer photo).
    AttachmentId
}
