//! Persistence boundary for fuel events.
//!
//! An [`EventStore`] hands out one [`UnitOfWork`] per ledger mutation. All
//! neighbor lookups and writes of that mutation go through the same unit,
//! so they observe one consistent view and either all commit or none do.
//! A unit that is dropped without [`UnitOfWork::commit`] rolls back.

use async_trait::async_trait;
use rust_decimal::Decimal;

use fleetfuel_types::{
    FuelEvent, FuelEventChanges, FuelEventDraft, FuelEventId, LedgerPosition, OrganizationId,
    VehicleId,
};

use crate::StoreError;

/// Which side of a ledger position a neighbor lookup searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Latest event strictly before the position.
    Before,
    /// Earliest event strictly after the position.
    After,
}

/// A single-row neighbor lookup inside one vehicle's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborQuery {
    /// Tenant scope.
    pub organization_id: OrganizationId,
    /// Ledger scope.
    pub vehicle_id: VehicleId,
    /// Search direction relative to `position`.
    pub direction: Direction,
    /// Pivot position (exclusive).
    pub position: LedgerPosition,
    /// Event to skip, typically the one being edited.
    pub exclude: Option<FuelEventId>,
}

impl NeighborQuery {
    /// Whether `event` satisfies the scope, exclusion and direction of this
    /// query. The nearest matching event is the answer.
    pub fn matches(&self, event: &FuelEvent) -> bool {
        if event.organization_id != self.organization_id
            || event.vehicle_id != self.vehicle_id
            || self.exclude == Some(event.id)
        {
            return false;
        }
        match self.direction {
            Direction::Before => event.position() < self.position,
            Direction::After => event.position() > self.position,
        }
    }
}

/// Source of units of work.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// The transaction type this store produces.
    type Unit: UnitOfWork;

    /// Open a new unit of work.
    async fn begin(&self) -> Result<Self::Unit, StoreError>;
}

/// One atomic ledger transaction.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Serialize this unit against every other unit touching the same
    /// vehicle's ledger, until commit or rollback.
    async fn lock_vehicle(
        &mut self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<(), StoreError>;

    /// Nearest event matching `query`, or `None` at either end of the ledger.
    async fn find_one(&mut self, query: NeighborQuery) -> Result<Option<FuelEvent>, StoreError>;

    /// Look up an event by id within an organization.
    async fn find_by_id(
        &mut self,
        organization_id: OrganizationId,
        id: FuelEventId,
    ) -> Result<Option<FuelEvent>, StoreError>;

    /// Every event of one vehicle, ordered by [`LedgerPosition`].
    async fn list_vehicle(
        &mut self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<Vec<FuelEvent>, StoreError>;

    /// Insert an event. The store assigns id, sequence and timestamps.
    async fn create(&mut self, draft: FuelEventDraft) -> Result<FuelEvent, StoreError>;

    /// Replace the mutable columns of an event. Its sequence is preserved.
    async fn update(
        &mut self,
        id: FuelEventId,
        changes: FuelEventChanges,
    ) -> Result<FuelEvent, StoreError>;

    /// Overwrite only the derived consumption of an event.
    async fn set_consumption(
        &mut self,
        id: FuelEventId,
        average_consumption: Option<Decimal>,
    ) -> Result<(), StoreError>;

    /// Remove an event.
    async fn delete(&mut self, id: FuelEventId) -> Result<(), StoreError>;

    /// Make every write of this unit visible to other units.
    async fn commit(self) -> Result<(), StoreError>;
}
