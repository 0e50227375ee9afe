//! Whole-ledger verification of stored consumption rates.
//!
//! The write path never rescans a ledger: each mutation recomputes the
//! touched event and at most two neighbors. This module is the offline
//! counterpart. It walks a vehicle's full history in position order and
//! reports every event whose stored rate differs from what its immediate
//! predecessor implies.
//!
//! ```text
//! expected(E[i]) = derive_consumption(E[i], E[i - 1])
//! ```
//!
//! A mismatch is a [`RateDrift`]. Drift means rows were written outside the
//! maintainer (manual SQL, imports, or a bug).

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use fleetfuel_types::{FuelEvent, FuelEventId, LedgerPosition, VehicleId};

use crate::consumption::derive_consumption;

/// One event whose stored rate disagrees with its predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDrift {
    /// The drifted event.
    pub event_id: FuelEventId,
    /// Its vehicle.
    pub vehicle_id: VehicleId,
    /// Its position in the ledger.
    pub position: LedgerPosition,
    /// Rate currently stored.
    pub stored: Option<Decimal>,
    /// Rate derived from the predecessor.
    pub expected: Option<Decimal>,
}

/// Outcome of verifying a set of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResult {
    /// Every stored rate matches its derivation.
    Consistent,
    /// At least one event drifted.
    Drift(Vec<RateDrift>),
}

impl AuditResult {
    /// The drifted events, empty when consistent.
    pub fn drifts(&self) -> &[RateDrift] {
        match self {
            Self::Consistent => &[],
            Self::Drift(drifts) => drifts,
        }
    }

    /// Whether no drift was found.
    pub const fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }
}

/// Verify derivation for every event in `events`.
///
/// Events may belong to several vehicles and arrive in any order; each
/// vehicle's ledger is sorted by [`LedgerPosition`] before the walk.
/// Drifts are reported per vehicle in ledger order.
pub fn verify_ledger(events: &[FuelEvent]) -> AuditResult {
    let mut ledgers: BTreeMap<VehicleId, Vec<&FuelEvent>> = BTreeMap::new();
    for event in events {
        ledgers.entry(event.vehicle_id).or_default().push(event);
    }

    let mut drifts = Vec::new();
    for ledger in ledgers.values_mut() {
        ledger.sort_by_key(|e| e.position());

        let mut predecessor: Option<&FuelEvent> = None;
        for event in ledger.iter().copied() {
            let expected = derive_consumption(event.reading(), predecessor.map(FuelEvent::reading));
            if expected != event.average_consumption {
                drifts.push(RateDrift {
                    event_id: event.id,
                    vehicle_id: event.vehicle_id,
                    position: event.position(),
                    stored: event.average_consumption,
                    expected,
                });
            }
            predecessor = Some(event);
        }
    }

    if drifts.is_empty() {
        AuditResult::Consistent
    } else {
        AuditResult::Drift(drifts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    use fleetfuel_types::{FuelEventDetails, OrganizationId};

    use super::*;

    fn event(
        vehicle_id: VehicleId,
        day: u32,
        seq: i64,
        odometer_reading: Decimal,
        average_consumption: Option<Decimal>,
    ) -> FuelEvent {
        let date = Utc
            .with_ymd_and_hms(2026, 2, day, 7, 0, 0)
            .single()
            .unwrap_or_default();
        FuelEvent {
            id: FuelEventId::new(),
            organization_id: OrganizationId::new(),
            vehicle_id,
            date,
            seq,
            odometer_reading,
            volume: dec!(40),
            average_consumption,
            details: FuelEventDetails::default(),
            created_at: date,
            updated_at: date,
        }
    }

    #[test]
    fn consistent_ledger_passes() {
        let v = VehicleId::new();
        let events = vec![
            event(v, 10, 3, dec!(1400), Some(dec!(5))),
            event(v, 1, 1, dec!(1000), None),
            event(v, 5, 2, dec!(1200), Some(dec!(5))),
        ];
        assert_eq!(verify_ledger(&events), AuditResult::Consistent);
    }

    #[test]
    fn stale_rate_is_reported() {
        let v = VehicleId::new();
        let stale = event(v, 10, 3, dec!(1400), Some(dec!(10)));
        let stale_id = stale.id;
        let events = vec![
            event(v, 1, 1, dec!(1000), None),
            event(v, 5, 2, dec!(1200), Some(dec!(5))),
            stale,
        ];

        let result = verify_ledger(&events);
        assert!(!result.is_consistent());
        assert_eq!(result.drifts().len(), 1);
        let drift = result.drifts().first();
        assert_eq!(drift.map(|d| d.event_id), Some(stale_id));
        assert_eq!(drift.and_then(|d| d.expected), Some(dec!(5)));
    }

    #[test]
    fn first_event_with_a_rate_is_drift() {
        let v = VehicleId::new();
        let events = vec![event(v, 1, 1, dec!(1000), Some(dec!(7)))];
        let result = verify_ledger(&events);
        assert_eq!(result.drifts().first().map(|d| d.expected), Some(None));
    }

    #[test]
    fn vehicles_are_verified_independently() {
        let a = VehicleId::new();
        let b = VehicleId::new();
        let events = vec![
            event(a, 1, 1, dec!(1000), None),
            event(b, 2, 2, dec!(5000), None),
            event(a, 3, 3, dec!(1400), Some(dec!(10))),
        ];
        assert!(verify_ledger(&events).is_consistent());
    }

    #[test]
    fn equal_values_at_different_scales_are_not_drift() {
        let v = VehicleId::new();
        let events = vec![
            event(v, 1, 1, dec!(1000), None),
            event(v, 2, 2, dec!(1400), Some(dec!(10.0000))),
        ];
        assert!(verify_ledger(&events).is_consistent());
    }
}
