//! In-memory [`EventStore`] for tests and local tooling.
//!
//! A [`MemoryUnit`] holds the store-wide lock for its whole life and works
//! on a private copy of the state. [`UnitOfWork::commit`] swaps the copy
//! in; dropping the unit discards it. This serializes every mutation, which
//! is coarser than the per-vehicle locking of the `PostgreSQL` store but
//! gives the same guarantees.
//!
//! [`MemoryEventStore::fail_after_writes`] makes the store refuse writes
//! after a budget, to exercise rollback paths.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use fleetfuel_types::{
    FuelEvent, FuelEventChanges, FuelEventDraft, FuelEventId, OrganizationId, VehicleId,
};

use crate::StoreError;
use crate::store::{Direction, EventStore, NeighborQuery, UnitOfWork};

/// Write budget value meaning "never fail".
const UNLIMITED_WRITES: usize = usize::MAX;

/// Committed contents of a [`MemoryEventStore`].
#[derive(Debug, Clone)]
struct MemoryState {
    events: BTreeMap<FuelEventId, FuelEvent>,
    /// `None` once the counter has passed `i64::MAX`.
    next_seq: Option<i64>,
}

/// Thread-safe in-memory event store.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct MemoryEventStore {
    state: Arc<Mutex<MemoryState>>,
    write_budget: Arc<AtomicUsize>,
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::with_events(Vec::new())
    }

    /// Create a store pre-populated with `events`, stored verbatim.
    ///
    /// Sequence numbers assigned afterwards continue past the highest
    /// sequence among `events`. When that is `i64::MAX`, every later
    /// insert fails.
    pub fn with_events(events: Vec<FuelEvent>) -> Self {
        let next_seq = events
            .iter()
            .map(|e| e.seq)
            .max()
            .map_or(Some(1), |seq| seq.checked_add(1));
        let events = events.into_iter().map(|e| (e.id, e)).collect();
        Self {
            state: Arc::new(Mutex::new(MemoryState { events, next_seq })),
            write_budget: Arc::new(AtomicUsize::new(UNLIMITED_WRITES)),
        }
    }

    /// Allow `writes` more successful writes, then fail every later one.
    pub fn fail_after_writes(&self, writes: usize) {
        self.write_budget.store(writes, Ordering::SeqCst);
    }

    /// Stop injecting write failures.
    pub fn clear_failures(&self) {
        self.write_budget.store(UNLIMITED_WRITES, Ordering::SeqCst);
    }

    /// Committed events of one vehicle in ledger order.
    pub async fn ledger(
        &self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Vec<FuelEvent> {
        let state = self.state.lock().await;
        let mut events: Vec<FuelEvent> = state
            .events
            .values()
            .filter(|e| e.organization_id == organization_id && e.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        events.sort_by_key(FuelEvent::position);
        events
    }

    /// A committed event by id.
    pub async fn get(&self, id: FuelEventId) -> Option<FuelEvent> {
        self.state.lock().await.events.get(&id).cloned()
    }

    /// Number of committed events across all vehicles.
    pub async fn len(&self) -> usize {
        self.state.lock().await.events.len()
    }

    /// Whether the store holds no committed events.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.events.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnit {
            guard,
            working,
            write_budget: Arc::clone(&self.write_budget),
        })
    }
}

/// Unit of work over a [`MemoryEventStore`].
#[derive(Debug)]
pub struct MemoryUnit {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    write_budget: Arc<AtomicUsize>,
}

impl MemoryUnit {
    fn spend_write(&self) -> Result<(), StoreError> {
        self.write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |budget| {
                if budget == UNLIMITED_WRITES {
                    Some(budget)
                } else {
                    budget.checked_sub(1)
                }
            })
            .map(|_| ())
            .map_err(|_exhausted| StoreError::Backend {
                message: "injected write failure".to_owned(),
            })
    }

    fn event_mut(&mut self, id: FuelEventId) -> Result<&mut FuelEvent, StoreError> {
        self.working
            .events
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn lock_vehicle(
        &mut self,
        _organization_id: OrganizationId,
        _vehicle_id: VehicleId,
    ) -> Result<(), StoreError> {
        // The store-wide guard is already held.
        Ok(())
    }

    async fn find_one(&mut self, query: NeighborQuery) -> Result<Option<FuelEvent>, StoreError> {
        let candidates = self
            .working
            .events
            .values()
            .filter(|event| query.matches(event));
        let nearest = match query.direction {
            Direction::Before => candidates.max_by_key(|e| e.position()),
            Direction::After => candidates.min_by_key(|e| e.position()),
        };
        Ok(nearest.cloned())
    }

    async fn find_by_id(
        &mut self,
        organization_id: OrganizationId,
        id: FuelEventId,
    ) -> Result<Option<FuelEvent>, StoreError> {
        Ok(self
            .working
            .events
            .get(&id)
            .filter(|e| e.organization_id == organization_id)
            .cloned())
    }

    async fn list_vehicle(
        &mut self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<Vec<FuelEvent>, StoreError> {
        let mut events: Vec<FuelEvent> = self
            .working
            .events
            .values()
            .filter(|e| e.organization_id == organization_id && e.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        events.sort_by_key(FuelEvent::position);
        Ok(events)
    }

    async fn create(&mut self, draft: FuelEventDraft) -> Result<FuelEvent, StoreError> {
        self.spend_write()?;
        let seq = self.working.next_seq.ok_or_else(|| StoreError::Backend {
            message: "sequence counter exhausted".to_owned(),
        })?;
        self.working.next_seq = seq.checked_add(1);

        let now = Utc::now();
        let event = FuelEvent {
            id: FuelEventId::new(),
            organization_id: draft.organization_id,
            vehicle_id: draft.vehicle_id,
            date: draft.date,
            seq,
            odometer_reading: draft.odometer_reading,
            volume: draft.volume,
            average_consumption: draft.average_consumption,
            details: draft.details,
            created_at: now,
            updated_at: now,
        };
        self.working.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update(
        &mut self,
        id: FuelEventId,
        changes: FuelEventChanges,
    ) -> Result<FuelEvent, StoreError> {
        self.spend_write()?;
        let event = self.event_mut(id)?;
        event.vehicle_id = changes.vehicle_id;
        event.date = changes.date;
        event.odometer_reading = changes.odometer_reading;
        event.volume = changes.volume;
        event.average_consumption = changes.average_consumption;
        event.details = changes.details;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn set_consumption(
        &mut self,
        id: FuelEventId,
        average_consumption: Option<Decimal>,
    ) -> Result<(), StoreError> {
        self.spend_write()?;
        let event = self.event_mut(id)?;
        event.average_consumption = average_consumption;
        event.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&mut self, id: FuelEventId) -> Result<(), StoreError> {
        self.spend_write()?;
        self.working
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn commit(self) -> Result<(), StoreError> {
        let Self {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }
}
