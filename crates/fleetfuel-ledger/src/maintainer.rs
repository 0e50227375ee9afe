//! Ledger maintenance: keep every stored rate consistent with its
//! predecessor while events are created, corrected, moved and deleted.
//!
//! # Locality
//!
//! An event's rate depends only on its immediate predecessor. Changing one
//! event therefore invalidates at most two other stored rates: the event
//! that follows it at its new position, and the event that followed it at
//! its old position. Every operation here recomputes exactly those and
//! never rescans a ledger.
//!
//! # Atomicity
//!
//! Each operation runs in one [`UnitOfWork`]: vehicle lock, neighbor
//! lookups, the primary write and the neighbor writes. Any error drops the
//! unit uncommitted, so either all of them become visible or none do.

use rust_decimal::Decimal;

use fleetfuel_types::{
    FuelEvent, FuelEventChanges, FuelEventDraft, FuelEventId, FuelReading, LedgerPosition,
    NewFuelEvent, OrganizationId, UpdateFuelEvent, VehicleId,
};

use crate::audit::{AuditResult, verify_ledger};
use crate::consumption::derive_consumption;
use crate::neighbors::NeighborLocator;
use crate::store::{EventStore, UnitOfWork};
use crate::{LedgerError, StoreError};

/// A neighbor whose stored rate was rewritten as a side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborRewrite {
    /// The rewritten event.
    pub id: FuelEventId,
    /// Rate before the rewrite.
    pub previous: Option<Decimal>,
    /// Rate after the rewrite.
    pub current: Option<Decimal>,
}

/// Result of one ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOutcome {
    /// The event as persisted (for deletions, as it was before removal).
    pub event: FuelEvent,
    /// Neighbors whose rate changed. Never more than two.
    pub rewritten: Vec<NeighborRewrite>,
}

/// Orchestrates create/update/delete of fuel events over an [`EventStore`].
#[derive(Debug, Clone)]
pub struct LedgerMaintainer<S> {
    store: S,
}

impl<S: EventStore> LedgerMaintainer<S> {
    /// Wrap a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Log a refueling.
    ///
    /// The new event sorts after any existing event with the same date. Its
    /// rate is derived from its predecessor, and when it is backfilled
    /// before later events, its successor is recomputed against it.
    pub async fn create_event(
        &self,
        organization_id: OrganizationId,
        command: NewFuelEvent,
    ) -> Result<LedgerOutcome, LedgerError> {
        let mut unit = self.store.begin().await?;
        unit.lock_vehicle(organization_id, command.vehicle_id)
            .await?;

        let locator = NeighborLocator::new(organization_id, command.vehicle_id);
        let predecessor = locator
            .predecessor(&mut unit, LedgerPosition::tail_of(command.date), None)
            .await?;
        let reading = FuelReading {
            odometer_reading: command.odometer_reading,
            volume: command.volume,
        };
        let average_consumption =
            derive_consumption(reading, predecessor.as_ref().map(FuelEvent::reading));

        let event = unit
            .create(FuelEventDraft {
                organization_id,
                vehicle_id: command.vehicle_id,
                date: command.date,
                odometer_reading: command.odometer_reading,
                volume: command.volume,
                average_consumption,
                details: command.details,
            })
            .await?;

        let mut rewritten = Vec::new();
        if let Some(successor) = locator
            .successor(&mut unit, event.position(), Some(event.id))
            .await?
        {
            rederive(&mut unit, &successor, Some(&event), &mut rewritten).await?;
        }

        unit.commit().await?;

        tracing::debug!(
            event_id = %event.id,
            vehicle_id = %event.vehicle_id,
            position = %event.position(),
            neighbors_rewritten = rewritten.len(),
            "Created fuel event"
        );
        Ok(LedgerOutcome { event, rewritten })
    }

    /// Correct a refueling's date, odometer, volume, vehicle or details.
    ///
    /// The previous position is read from the store inside the unit of
    /// work. After the event itself is rewritten, the successor at its new
    /// position adopts it as predecessor, and the successor at its old
    /// position adopts whatever now precedes it. When both are the same
    /// event it is recomputed once.
    pub async fn update_event(
        &self,
        organization_id: OrganizationId,
        command: UpdateFuelEvent,
    ) -> Result<LedgerOutcome, LedgerError> {
        let mut unit = self.store.begin().await?;
        let current =
            load_locked(&mut unit, organization_id, command.id, Some(command.vehicle_id)).await?;

        let old_position = current.position();
        let old_locator = NeighborLocator::for_event(&current);
        let new_locator = NeighborLocator::new(organization_id, command.vehicle_id);
        let new_position = LedgerPosition::new(command.date, current.seq);

        let predecessor = new_locator
            .predecessor(&mut unit, new_position, Some(command.id))
            .await?;
        let reading = FuelReading {
            odometer_reading: command.odometer_reading,
            volume: command.volume,
        };
        let average_consumption =
            derive_consumption(reading, predecessor.as_ref().map(FuelEvent::reading));

        let event = unit
            .update(
                command.id,
                FuelEventChanges {
                    vehicle_id: command.vehicle_id,
                    date: command.date,
                    odometer_reading: command.odometer_reading,
                    volume: command.volume,
                    average_consumption,
                    details: command.details,
                },
            )
            .await?;

        let mut rewritten = Vec::new();

        let new_successor = new_locator
            .successor(&mut unit, event.position(), Some(event.id))
            .await?;
        if let Some(successor) = &new_successor {
            rederive(&mut unit, successor, Some(&event), &mut rewritten).await?;
        }

        let old_successor = old_locator
            .successor(&mut unit, old_position, Some(event.id))
            .await?;
        if let Some(successor) = old_successor
            && new_successor.as_ref().map(|s| s.id) != Some(successor.id)
        {
            let adopted = old_locator
                .predecessor(&mut unit, successor.position(), Some(event.id))
                .await?;
            rederive(&mut unit, &successor, adopted.as_ref(), &mut rewritten).await?;
        }

        unit.commit().await?;

        if current.vehicle_id != event.vehicle_id {
            tracing::info!(
                event_id = %event.id,
                from_vehicle = %current.vehicle_id,
                to_vehicle = %event.vehicle_id,
                "Reassigned fuel event to another vehicle"
            );
        }
        tracing::debug!(
            event_id = %event.id,
            vehicle_id = %event.vehicle_id,
            from = %old_position,
            to = %event.position(),
            neighbors_rewritten = rewritten.len(),
            "Updated fuel event"
        );
        Ok(LedgerOutcome { event, rewritten })
    }

    /// Remove a refueling and splice the ledger: its successor adopts its
    /// predecessor.
    pub async fn delete_event(
        &self,
        organization_id: OrganizationId,
        id: FuelEventId,
    ) -> Result<LedgerOutcome, LedgerError> {
        let mut unit = self.store.begin().await?;
        let event = load_locked(&mut unit, organization_id, id, None).await?;

        unit.delete(id).await?;

        let mut rewritten = Vec::new();
        let locator = NeighborLocator::for_event(&event);
        if let Some(successor) = locator
            .successor(&mut unit, event.position(), Some(id))
            .await?
        {
            let adopted = locator
                .predecessor(&mut unit, successor.position(), Some(id))
                .await?;
            rederive(&mut unit, &successor, adopted.as_ref(), &mut rewritten).await?;
        }

        unit.commit().await?;

        tracing::debug!(
            event_id = %id,
            vehicle_id = %event.vehicle_id,
            neighbors_rewritten = rewritten.len(),
            "Deleted fuel event"
        );
        Ok(LedgerOutcome { event, rewritten })
    }

    /// Verify every stored rate of one vehicle against its derivation.
    ///
    /// Read-only; the unit of work is released without writes.
    pub async fn audit_vehicle(
        &self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<AuditResult, LedgerError> {
        let mut unit = self.store.begin().await?;
        let events = unit.list_vehicle(organization_id, vehicle_id).await?;
        drop(unit);

        let result = verify_ledger(&events);
        log_audit(vehicle_id, events.len(), &result);
        Ok(result)
    }

    /// Audit one vehicle and overwrite every drifted rate with its
    /// derivation, atomically. Returns the drift found before repair.
    pub async fn repair_vehicle(
        &self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<AuditResult, LedgerError> {
        let mut unit = self.store.begin().await?;
        unit.lock_vehicle(organization_id, vehicle_id).await?;
        let events = unit.list_vehicle(organization_id, vehicle_id).await?;

        let result = verify_ledger(&events);
        log_audit(vehicle_id, events.len(), &result);

        for drift in result.drifts() {
            unit.set_consumption(drift.event_id, drift.expected).await?;
        }
        unit.commit().await?;

        if !result.is_consistent() {
            tracing::info!(
                %vehicle_id,
                repaired = result.drifts().len(),
                "Repaired fuel ledger"
            );
        }
        Ok(result)
    }
}

/// Fetch an event by id, lock its vehicle (and `target_vehicle` when the
/// event is being moved), then re-read it under the lock.
///
/// Vehicles are locked in ascending id order so two reassignments in
/// opposite directions cannot deadlock.
async fn load_locked<U: UnitOfWork>(
    unit: &mut U,
    organization_id: OrganizationId,
    id: FuelEventId,
    target_vehicle: Option<VehicleId>,
) -> Result<FuelEvent, LedgerError> {
    let unlocked = unit
        .find_by_id(organization_id, id)
        .await?
        .ok_or(LedgerError::EventNotFound(id))?;

    let mut vehicles = vec![unlocked.vehicle_id];
    vehicles.extend(target_vehicle);
    vehicles.sort_unstable();
    vehicles.dedup();
    for vehicle_id in &vehicles {
        unit.lock_vehicle(organization_id, *vehicle_id).await?;
    }

    let event = unit
        .find_by_id(organization_id, id)
        .await?
        .ok_or(LedgerError::EventNotFound(id))?;
    if !vehicles.contains(&event.vehicle_id) {
        // Moved by a concurrent unit between the first read and the lock.
        unit.lock_vehicle(organization_id, event.vehicle_id).await?;
    }
    Ok(event)
}

/// Recompute `target`'s rate against `predecessor` and persist it when it
/// changed.
async fn rederive<U: UnitOfWork>(
    unit: &mut U,
    target: &FuelEvent,
    predecessor: Option<&FuelEvent>,
    rewritten: &mut Vec<NeighborRewrite>,
) -> Result<(), StoreError> {
    let current = derive_consumption(target.reading(), predecessor.map(FuelEvent::reading));
    if current == target.average_consumption {
        return Ok(());
    }

    unit.set_consumption(target.id, current).await?;
    rewritten.push(NeighborRewrite {
        id: target.id,
        previous: target.average_consumption,
        current,
    });
    Ok(())
}

fn log_audit(vehicle_id: VehicleId, events: usize, result: &AuditResult) {
    match result {
        AuditResult::Consistent => {
            tracing::debug!(%vehicle_id, events, "Fuel ledger consistent");
        }
        AuditResult::Drift(drifts) => {
            for drift in drifts {
                tracing::warn!(
                    %vehicle_id,
                    event_id = %drift.event_id,
                    position = %drift.position,
                    stored = ?drift.stored,
                    expected = ?drift.expected,
                    "Fuel ledger rate drift"
                );
            }
        }
    }
}
