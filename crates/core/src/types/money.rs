//! Money helpers for talking to payment processors.
//!
//! All amounts in the system are [`rust_decimal::Decimal`] values in the
//! currency's major unit (rands, not cents). Processors want one of two
//! wire shapes:
//!
//! - an integer count of **minor units** (Stripe `unit_amount`), or
//! - a string with **exactly two decimal places** (PayFast `amount`).
//!
//! Conversion to minor units must round to the nearest integer, never
//! truncate: truncating `99.99 * 100` would undercharge every fractional
//! cent systematically.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert a major-unit amount to an integer count of minor units
/// (e.g. `99.99` → `9999`).
///
/// Rounds half away from zero. Returns `None` when the result does not fit
/// in an `i64` (no real order total does).
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Format a major-unit amount with exactly two decimal places
/// (e.g. `299.9` → `"299.90"`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("literal decimal")
    }

    #[test]
    fn test_minor_units_rounds_not_truncates() {
        // 99.99 * 100 must be 9999, not 9998 from float drift
        assert_eq!(to_minor_units(dec("99.99")), Some(9999));
        assert_eq!(to_minor_units(dec("0.01")), Some(1));
        assert_eq!(to_minor_units(dec("199.98")), Some(19998));
    }

    #[test]
    fn test_minor_units_midpoint_goes_away_from_zero() {
        // Sub-cent prices round to the nearest cent
        assert_eq!(to_minor_units(dec("1.005")), Some(101));
        assert_eq!(to_minor_units(dec("1.004")), Some(100));
    }

    #[test]
    fn test_minor_units_zero() {
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
    }

    #[test]
    fn test_format_amount_pads_to_two_places() {
        assert_eq!(format_amount(dec("299.9")), "299.90");
        assert_eq!(format_amount(dec("100")), "100.00");
    }

    #[test]
    fn test_format_amount_rounds_excess_precision() {
        assert_eq!(format_amount(dec("10.005")), "10.01");
        assert_eq!(format_amount(dec("10.004")), "10.00");
    }
}
