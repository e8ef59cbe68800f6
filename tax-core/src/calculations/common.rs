//! Presentation-time rounding helpers.
//!
//! Calculations keep full precision; these functions are for the layer that
//! displays results, so rounding happens once, at the edge.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to cents, with exact midpoints going away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(17739.165)), dec!(17739.17));
/// assert_eq!(round_half_up(dec!(7529.554)), dec!(7529.55));
/// assert_eq!(round_half_up(dec!(-0.005)), dec!(-0.01));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a fractional rate into a percentage rounded to two decimal places.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::percentage;
///
/// assert_eq!(percentage(dec!(0.17739165)), dec!(17.74));
/// assert_eq!(percentage(dec!(0.205)), dec!(20.50));
/// ```
pub fn percentage(rate: Decimal) -> Decimal {
    round_half_up(rate * Decimal::ONE_HUNDRED)
}
