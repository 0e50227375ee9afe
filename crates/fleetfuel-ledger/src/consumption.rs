//! Average-consumption arithmetic.
//!
//! The rate stored on an event is distance per fuel unit over the interval
//! that ends at that event:
//!
//! ```text
//! rate = (odometer - predecessor.odometer) / volume
//! ```
//!
//! Refuel logs come from hand-entered field data, so the calculation never
//! fails an operation. Negative rates clamp to zero, and rates at or above
//! [`OUTLIER_THRESHOLD`] are discarded rather than stored.

use rust_decimal::{Decimal, RoundingStrategy};

use fleetfuel_types::FuelReading;

/// Rates at or above this value are treated as data-entry errors.
pub const OUTLIER_THRESHOLD: Decimal = Decimal::ONE_THOUSAND;

/// Decimal places kept on a stored rate.
pub const RATE_SCALE: u32 = 4;

/// Distance per fuel unit, clamped at zero.
///
/// `volume` is expected to be positive; callers filter that upstream. A zero
/// volume (or a quotient that overflows [`Decimal`]) yields `None`. The
/// quotient is rounded to [`RATE_SCALE`] places, half away from zero.
pub fn compute_rate(distance: Decimal, volume: Decimal) -> Option<Decimal> {
    distance.checked_div(volume).map(storable_rate)
}

/// Clamp a raw quotient at zero and round it to [`RATE_SCALE`] places.
///
/// A quotient below [`OUTLIER_THRESHOLD`] never rounds up onto it: such
/// values are truncated instead, so every stored rate stays below the
/// threshold.
fn storable_rate(quotient: Decimal) -> Decimal {
    if quotient.is_sign_negative() {
        return Decimal::ZERO;
    }

    let rounded =
        quotient.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded >= OUTLIER_THRESHOLD && quotient < OUTLIER_THRESHOLD {
        quotient.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::ToZero)
    } else {
        rounded
    }
}

/// Derive the rate an event should store given its predecessor.
///
/// Returns `None` when there is no predecessor, when the event's own volume
/// is not positive, or when the exact quotient reaches
/// [`OUTLIER_THRESHOLD`]. Rounding happens only after that check.
pub fn derive_consumption(
    current: FuelReading,
    predecessor: Option<FuelReading>,
) -> Option<Decimal> {
    let predecessor = predecessor?;

    if current.volume <= Decimal::ZERO {
        return None;
    }

    let distance = current
        .odometer_reading
        .checked_sub(predecessor.odometer_reading)?;
    let quotient = distance.checked_div(current.volume)?;

    if quotient >= OUTLIER_THRESHOLD {
        tracing::warn!(
            %distance,
            volume = %current.volume,
            rate = %quotient,
            "Discarding implausible consumption rate"
        );
        return None;
    }

    Some(storable_rate(quotient))
}
