//! `PostgreSQL` implementation of the ledger's [`EventStore`] contract.
//!
//! Each [`PgUnit`] is one `PostgreSQL` transaction. Ledger mutations are
//! serialized per vehicle with a transaction-scoped advisory lock keyed on
//! the vehicle id, so two writers on the same ledger never interleave
//! between "find successor" and "rewrite successor". Writers on different
//! vehicles proceed in parallel.
//!
//! See `migrations/0001_fuel_events.sql` for the schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use fleetfuel_ledger::store::{Direction, EventStore, NeighborQuery, UnitOfWork};
use fleetfuel_ledger::StoreError;
use fleetfuel_types::{
    AttachmentId, DriverId, FuelEvent, FuelEventChanges, FuelEventDetails, FuelEventDraft,
    FuelEventId, OrganizationId, VehicleId,
};

use crate::error::backend;

/// Column list shared by every query returning a [`FuelEventRow`].
const COLUMNS: &str = "id, organization_id, vehicle_id, date, seq, odometer_reading, volume, \
     average_consumption, driver_id, total_cost, station, fuel_meter_photo, odometer_photo, \
     created_at, updated_at";

/// Operations on the `fuel_events` table.
pub struct FuelEventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> FuelEventStore<'a> {
    /// Create a new store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for FuelEventStore<'_> {
    type Unit = PgUnit;

    async fn begin(&self) -> Result<Self::Unit, StoreError> {
        let tx = self.pool.begin().await.map_err(backend)?;
        Ok(PgUnit { tx })
    }
}

/// One ledger transaction. Dropping it without commit rolls back.
pub struct PgUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnit {
    async fn lock_vehicle(
        &mut self,
        _organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::UUID::TEXT, 0))")
            .bind(vehicle_id.into_inner())
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;

        tracing::trace!(%vehicle_id, "Acquired vehicle ledger lock");
        Ok(())
    }

    async fn find_one(&mut self, query: NeighborQuery) -> Result<Option<FuelEvent>, StoreError> {
        let (comparison, order) = match query.direction {
            Direction::Before => ("<", "DESC"),
            Direction::After => (">", "ASC"),
        };
        let sql = format!(
            "SELECT {COLUMNS}
               FROM fuel_events
              WHERE organization_id = $1
                AND vehicle_id = $2
                AND (date, seq) {comparison} ($3, $4)
                AND ($5::UUID IS NULL OR id <> $5)
              ORDER BY date {order}, seq {order}
              LIMIT 1"
        );

        let row = sqlx::query_as::<_, FuelEventRow>(&sql)
            .bind(query.organization_id.into_inner())
            .bind(query.vehicle_id.into_inner())
            .bind(query.position.date)
            .bind(query.position.seq)
            .bind(query.exclude.map(FuelEventId::into_inner))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;

        Ok(row.map(FuelEvent::from))
    }

    async fn find_by_id(
        &mut self,
        organization_id: OrganizationId,
        id: FuelEventId,
    ) -> Result<Option<FuelEvent>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM fuel_events WHERE id = $1 AND organization_id = $2"
        );
        let row = sqlx::query_as::<_, FuelEventRow>(&sql)
            .bind(id.into_inner())
            .bind(organization_id.into_inner())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;

        Ok(row.map(FuelEvent::from))
    }

    async fn list_vehicle(
        &mut self,
        organization_id: OrganizationId,
        vehicle_id: VehicleId,
    ) -> Result<Vec<FuelEvent>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS}
               FROM fuel_events
              WHERE organization_id = $1 AND vehicle_id = $2
              ORDER BY date, seq"
        );
        let rows = sqlx::query_as::<_, FuelEventRow>(&sql)
            .bind(organization_id.into_inner())
            .bind(vehicle_id.into_inner())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(backend)?;

        Ok(rows.into_iter().map(FuelEvent::from).collect())
    }

    async fn create(&mut self, draft: FuelEventDraft) -> Result<FuelEvent, StoreError> {
        let sql = format!(
            "INSERT INTO fuel_events (id, organization_id, vehicle_id, date, odometer_reading,
                                      volume, average_consumption, driver_id, total_cost,
                                      station, fuel_meter_photo, odometer_photo)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        let details = draft.details;
        let row = sqlx::query_as::<_, FuelEventRow>(&sql)
            .bind(FuelEventId::new().into_inner())
            .bind(draft.organization_id.into_inner())
            .bind(draft.vehicle_id.into_inner())
            .bind(draft.date)
            .bind(draft.odometer_reading)
            .bind(draft.volume)
            .bind(draft.average_consumption)
            .bind(details.driver_id.map(DriverId::into_inner))
            .bind(details.total_cost)
            .bind(details.station)
            .bind(details.fuel_meter_photo.map(AttachmentId::into_inner))
            .bind(details.odometer_photo.map(AttachmentId::into_inner))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(backend)?;

        Ok(row.into())
    }

    async fn update(
        &mut self,
        id: FuelEventId,
        changes: FuelEventChanges,
    ) -> Result<FuelEvent, StoreError> {
        let sql = format!(
            "UPDATE fuel_events
                SET vehicle_id = $2, date = $3, odometer_reading = $4, volume = $5,
                    average_consumption = $6, driver_id = $7, total_cost = $8, station = $9,
                    fuel_meter_photo = $10, odometer_photo = $11, updated_at = now()
              WHERE id = $1
          RETURNING {COLUMNS}"
        );
        let details = changes.details;
        let row = sqlx::query_as::<_, FuelEventRow>(&sql)
            .bind(id.into_inner())
            .bind(changes.vehicle_id.into_inner())
            .bind(changes.date)
            .bind(changes.odometer_reading)
            .bind(changes.volume)
            .bind(changes.average_consumption)
            .bind(details.driver_id.map(DriverId::into_inner))
            .bind(details.total_cost)
            .bind(details.station)
            .bind(details.fuel_meter_photo.map(AttachmentId::into_inner))
            .bind(details.odometer_photo.map(AttachmentId::into_inner))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(backend)?;

        row.map(FuelEvent::from).ok_or(StoreError::NotFound(id))
    }

    async fn set_consumption(
        &mut self,
        id: FuelEventId,
        average_consumption: Option<Decimal>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE fuel_events SET average_consumption = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.into_inner())
        .bind(average_consumption)
        .execute(&mut *self.tx)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&mut self, id: FuelEventId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM fuel_events WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(backend)
    }
}

/// A row from the `fuel_events` table.
///
/// Uses runtime types rather than compile-time checked types to
/// avoid requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FuelEventRow {
    /// Event UUID.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Vehicle ledger.
    pub vehicle_id: Uuid,
    /// Refueling timestamp.
    pub date: DateTime<Utc>,
    /// Insertion counter.
    pub seq: i64,
    /// Odometer at refueling time.
    pub odometer_reading: Decimal,
    /// Fuel volume purchased.
    pub volume: Decimal,
    /// Derived consumption, if any.
    pub average_consumption: Option<Decimal>,
    /// Driver who refueled.
    pub driver_id: Option<Uuid>,
    /// Amount paid.
    pub total_cost: Option<Decimal>,
    /// Station name or location.
    pub station: Option<String>,
    /// Fuel-meter photo attachment.
    pub fuel_meter_photo: Option<Uuid>,
    /// Odometer photo attachment.
    pub odometer_photo: Option<Uuid>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl From<FuelEventRow> for FuelEvent {
    fn from(row: FuelEventRow) -> Self {
        Self {
            id: row.id.into(),
            organization_id: row.organization_id.into(),
            vehicle_id: row.vehicle_id.into(),
            date: row.date,
            seq: row.seq,
            odometer_reading: row.odometer_reading,
            volume: row.volume,
            average_consumption: row.average_consumption,
            details: FuelEventDetails {
                driver_id: row.driver_id.map(DriverId::from),
                total_cost: row.total_cost,
                station: row.station,
                fuel_meter_photo: row.fuel_meter_photo.map(AttachmentId::from),
                odometer_photo: row.odometer_photo.map(AttachmentId::from),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
