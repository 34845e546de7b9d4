//! Prices and quantities

use rusty_money::{Money, iso::Currency};

use crate::items::CartLineItem;

/// Upper bound applied to quantities restored from local or remote storage.
pub const QUANTITY_CAP: u32 = 999;

/// Clamp a restored quantity to [`QUANTITY_CAP`].
pub fn sanity_cap(quantity: u32) -> u32 {
    quantity.min(QUANTITY_CAP)
}

/// Apply a signed delta to a quantity.
///
/// Returns `None` when the result would be zero or negative, meaning the line
/// should be removed. Results above `u32::MAX` saturate.
pub fn apply_delta(quantity: u32, delta: i64) -> Option<u32> {
    let next = i64::from(quantity).saturating_add(delta);

    if next <= 0 {
        return None;
    }

    Some(u32::try_from(next).unwrap_or(u32::MAX))
}

/// Sum of `unit_price * quantity` over non-gift lines, in minor units.
pub fn subtotal_minor(lines: &[CartLineItem]) -> i64 {
    lines
        .iter()
        .filter(|line| !line.is_gift())
        .map(CartLineItem::line_total_minor)
        .fold(0, i64::saturating_add)
}

/// Sum of `unit_price * quantity` over non-gift lines.
pub fn subtotal(lines: &[CartLineItem], currency: &'static Currency) -> Money<'static, Currency> {
    Money::from_minor(subtotal_minor(lines), currency)
}

/// Sum of non-gift quantities, as shown on the cart badge.
pub fn total_quantity(lines: &[CartLineItem]) -> u32 {
    lines
        .iter()
        .filter(|line| !line.is_gift())
        .map(CartLineItem::quantity)
        .fold(0, u32::saturating_add)
}
