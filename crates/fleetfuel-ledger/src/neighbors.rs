//! Predecessor and successor lookups within one vehicle's ledger.

use fleetfuel_types::{FuelEvent, FuelEventId, LedgerPosition, OrganizationId, VehicleId};

use crate::StoreError;
use crate::store::{Direction, NeighborQuery, UnitOfWork};

/// Read-only neighbor queries scoped to one organization and one vehicle.
///
/// The locator holds no connection of its own: every call is given the
/// unit of work of the surrounding mutation, so lookups see that unit's
/// uncommitted writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborLocator {
    organization_id: OrganizationId,
    vehicle_id: VehicleId,
}

impl NeighborLocator {
    /// Scope a locator to one vehicle's ledger.
    pub const fn new(organization_id: OrganizationId, vehicle_id: VehicleId) -> Self {
        Self {
            organization_id,
            vehicle_id,
        }
    }

    /// Scope a locator to the ledger `event` belongs to.
    pub const fn for_event(event: &FuelEvent) -> Self {
        Self::new(event.organization_id, event.vehicle_id)
    }

    /// Latest event strictly before `before`, skipping `exclude`.
    pub async fn predecessor<U: UnitOfWork>(
        &self,
        unit: &mut U,
        before: LedgerPosition,
        exclude: Option<FuelEventId>,
    ) -> Result<Option<FuelEvent>, StoreError> {
        unit.find_one(self.query(Direction::Before, before, exclude))
            .await
    }

    /// Earliest event strictly after `after`, skipping `exclude`.
    pub async fn successor<U: UnitOfWork>(
        &self,
        unit: &mut U,
        after: LedgerPosition,
        exclude: Option<FuelEventId>,
    ) -> Result<Option<FuelEvent>, StoreError> {
        unit.find_one(self.query(Direction::After, after, exclude))
            .await
    }

    const fn query(
        &self,
        direction: Direction,
        position: LedgerPosition,
        exclude: Option<FuelEventId>,
    ) -> NeighborQuery {
        NeighborQuery {
            organization_id: self.organization_id,
            vehicle_id: self.vehicle_id,
            direction,
            position,
            exclude,
        }
    }
}
