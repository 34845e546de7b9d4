//! Free Gift Promotion
//!
//! A single-tier spend threshold: once the non-gift subtotal reaches the
//! threshold, one synthetic gift line is appended to the cart. Dropping back
//! below the threshold removes it again.

use rusty_money::{Money, iso::Currency};

use crate::{
    items::CartLineItem,
    pricing::subtotal,
    products::ProductId,
};

/// Identifier of the synthetic gift line.
pub const GIFT_PRODUCT_ID: &str = "gift";

/// Default gift threshold, in major units of the store currency.
pub const DEFAULT_GIFT_THRESHOLD: i64 = 1499;

const GIFT_NAME: &str = "Premium Phone Cleaning Kit (FREE)";
const GIFT_IMAGE: &str =
    "https://images.unsplash.com/photo-1556656793-08538906a9f8?w=150&h=150&fit=crop";

/// The item handed out by the promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftItem {
    /// Fixed identity of the gift line.
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Image URL
    pub image: String,
}

impl Default for GiftItem {
    fn default() -> Self {
        Self {
            id: ProductId::from(GIFT_PRODUCT_ID),
            name: GIFT_NAME.to_string(),
            image: GIFT_IMAGE.to_string(),
        }
    }
}

/// Spend-threshold free gift promotion.
#[derive(Debug, Clone)]
pub struct FreeGiftPromotion {
    threshold: Money<'static, Currency>,
    gift: GiftItem,
}

impl FreeGiftPromotion {
    /// Create a promotion with the given threshold and gift.
    pub fn new(threshold: Money<'static, Currency>, gift: GiftItem) -> Self {
        Self { threshold, gift }
    }

    /// Create a promotion handing out the default gift.
    pub fn with_threshold(threshold: Money<'static, Currency>) -> Self {
        Self::new(threshold, GiftItem::default())
    }

    /// Return the spend threshold.
    pub fn threshold(&self) -> &Money<'static, Currency> {
        &self.threshold
    }

    /// Return the gift.
    pub fn gift(&self) -> &GiftItem {
        &self.gift
    }

    /// Currency the promotion (and therefore the cart) is priced in.
    pub fn currency(&self) -> &'static Currency {
        self.threshold.currency()
    }

    /// Whether a subtotal in minor units unlocks the gift.
    pub fn qualifies(&self, subtotal_minor: i64) -> bool {
        subtotal_minor >= self.threshold.to_minor_units()
    }

    /// Re-derive the gift line from the non-gift lines.
    ///
    /// Removes every gift line, then appends exactly one when the subtotal meets
    /// the threshold. Applying it twice yields the same lines.
    pub fn apply(&self, lines: &mut Vec<CartLineItem>) {
        lines.retain(|line| !line.is_gift());

        let subtotal = subtotal(lines, self.currency());

        if self.qualifies(subtotal.to_minor_units()) {
            lines.push(CartLineItem::gift(
                self.gift.id.clone(),
                self.gift.name.clone(),
                self.gift.image.clone(),
                self.currency(),
            ));
        }
    }

    /// How far `lines` are from unlocking the gift.
    pub fn progress(&self, lines: &[CartLineItem]) -> GiftProgress {
        let subtotal_minor = subtotal(lines, self.currency()).to_minor_units();
        let threshold_minor = self.threshold.to_minor_units();
        let remaining = threshold_minor.saturating_sub(subtotal_minor).max(0);

        let percent = if threshold_minor <= 0 {
            100
        } else {
            let scaled = i128::from(subtotal_minor.max(0)) * 100 / i128::from(threshold_minor);
            u8::try_from(scaled.min(100)).unwrap_or(100)
        };

        GiftProgress {
            remaining: Money::from_minor(remaining, self.currency()),
            percent,
            unlocked: self.qualifies(subtotal_minor),
        }
    }
}

/// Progress towards the free gift.
#[derive(Debug, Clone, PartialEq)]
pub struct GiftProgress {
    remaining: Money<'static, Currency>,
    percent: u8,
    unlocked: bool,
}

impl GiftProgress {
    /// Amount still to spend; zero once unlocked.
    pub fn remaining(&self) -> &Money<'static, Currency> {
        &self.remaining
    }

    /// Progress towards the threshold, `0..=100`.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Whether the gift is unlocked.
    pub fn unlocked(&self) -> bool {
        self.unlocked
    }

    /// Shopper-facing progress message.
    pub fn message(&self) -> String {
        if self.unlocked {
            "Free gift unlocked!".to_string()
        } else {
            format!("Add {} more to get FREE gift", self.remaining)
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::INR;

    use crate::products::Product;

    use super::*;

    fn promotion() -> FreeGiftPromotion {
        FreeGiftPromotion::with_threshold(Money::from_major(DEFAULT_GIFT_THRESHOLD, INR))
    }

    fn line(id: &str, major: i64, quantity: u32) -> CartLineItem {
        CartLineItem::from_product(&Product::new(id, id, Money::from_major(major, INR)), quantity)
    }

    fn gift_count(lines: &[CartLineItem]) -> usize {
        lines.iter().filter(|line| line.is_gift()).count()
    }

    #[test]
    fn below_threshold_has_no_gift() {
        let mut lines = vec![line("p1", 999, 1)];

        promotion().apply(&mut lines);

        assert_eq!(gift_count(&lines), 0);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn exactly_at_threshold_unlocks_gift() {
        let mut lines = vec![line("p1", 1499, 1)];

        promotion().apply(&mut lines);

        assert_eq!(gift_count(&lines), 1);
        let gift = lines.last().filter(|line| line.is_gift());
        assert_eq!(gift.map(CartLineItem::quantity), Some(1));
        assert_eq!(gift.map(CartLineItem::line_total_minor), Some(0));
        assert_eq!(
            gift.map(|line| line.product_id().as_str()),
            Some(GIFT_PRODUCT_ID)
        );
    }

    #[test]
    fn apply_is_idempotent() {
        let mut lines = vec![line("p1", 999, 2)];
        let promotion = promotion();

        promotion.apply(&mut lines);
        let once = lines.clone();
        promotion.apply(&mut lines);

        assert_eq!(lines, once);
        assert_eq!(gift_count(&lines), 1);
    }

    #[test]
    fn apply_removes_stale_gift_lines() {
        let mut lines = vec![
            line("p1", 10, 1),
            CartLineItem::gift(ProductId::from(GIFT_PRODUCT_ID), "Gift", "", INR),
            CartLineItem::gift(ProductId::from(GIFT_PRODUCT_ID), "Gift", "", INR),
        ];

        promotion().apply(&mut lines);

        assert_eq!(gift_count(&lines), 0);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn progress_reports_remaining_amount() {
        let progress = promotion().progress(&[line("p1", 999, 1)]);

        assert!(!progress.unlocked(), "999 is below the threshold");
        assert_eq!(progress.remaining(), &Money::from_major(500, INR));
        assert_eq!(progress.percent(), 66);
        assert!(
            progress.message().starts_with("Add "),
            "unexpected message: {}",
            progress.message()
        );
    }

    #[test]
    fn progress_caps_at_one_hundred_percent() {
        let progress = promotion().progress(&[line("p1", 999, 5)]);

        assert!(progress.unlocked(), "4995 unlocks the gift");
        assert_eq!(progress.percent(), 100);
        assert_eq!(progress.remaining(), &Money::from_minor(0, INR));
        assert_eq!(progress.message(), "Free gift unlocked!");
    }
}
