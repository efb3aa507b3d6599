//! Money helpers
//!
//! Amounts are `Decimal` end to end; rounding happens only when a figure is
//! shown or billed.

use rust_decimal::prelude::*;

/// Billed amounts are rounded to cents, half away from zero
pub const DECIMAL_PLACES: u32 = 2;

/// Largest unit price accepted from outside (1,000,000)
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest quantity accepted for a single line
pub const MAX_QUANTITY: i32 = 9999;

/// Round to cents
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a price from its textual form ("5", "5.00", "1e1")
///
/// Negative and out-of-range prices yield `None`.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let value = Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()?;
    if value.is_sign_negative() || value > MAX_PRICE {
        return None;
    }
    Some(value.normalize())
}
