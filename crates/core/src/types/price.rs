//! Decimal price helpers.
//!
//! Prices are carried as [`rust_decimal::Decimal`] in the store's single
//! currency. Binary floats only appear at the JSON boundary, where the backend
//! and the local cart mirror both speak plain numbers.

use rust_decimal::{Decimal, RoundingStrategy};

/// Price of `quantity` units at `unit_price`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// Format a price for display, e.g. `$19.99`.
///
/// ```
/// use rust_decimal::Decimal;
/// use sundry_core::format_price;
///
/// assert_eq!(format_price(Decimal::new(1999, 2)), "$19.99");
/// assert_eq!(format_price(Decimal::from(20)), "$20.00");
/// ```
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}
