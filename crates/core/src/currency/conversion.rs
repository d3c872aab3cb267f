//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Multiply first, round once, to the target currency's decimal places
//! - Round half-up (away from zero at the midpoint)
//! - Store both original and converted amounts

use folio_shared::types::round_half_up;
use rust_decimal::Decimal;

/// Converts an amount using the given exchange rate.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    round_half_up(amount * rate, decimal_places)
}
