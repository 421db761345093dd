//! Decimal arithmetic utilities for price and score calculations.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Round a decimal to a specific number of decimal places.
pub fn round_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp(decimals)
}

/// Signed percentage change from `previous` to `current`.
///
/// Returns zero when `previous` is zero and `None` when the result does not
/// fit in a `Decimal`.
pub fn percentage_change(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return Some(Decimal::ZERO);
    }
    current
        .checked_sub(previous)?
        .checked_div(previous)?
        .checked_mul(dec!(100))
}

/// Convert a float taken from a provider payload into a decimal.
///
/// Returns `None` for NaN and infinities.
pub fn from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value)
}

/// Floor a non-negative decimal into an integer, saturating at `max`.
pub fn floor_capped(value: Decimal, max: u32) -> u32 {
    if value <= Decimal::ZERO {
        return 0;
    }
    value
        .floor()
        .to_u32()
        .map(|v| v.min(max))
        .unwrap_or(max)
}
