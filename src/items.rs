//! Cart line items

use rusty_money::{Money, iso::Currency};

use crate::products::{Product, ProductId};

/// A single cart line.
///
/// Price, name and image are snapshots taken when the line was built; the
/// catalog stays authoritative and lines are rebuilt from it on every load.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLineItem {
    product_id: ProductId,
    quantity: u32,
    unit_price: Money<'static, Currency>,
    display_name: String,
    image_url: String,
    is_gift: bool,
}

impl CartLineItem {
    /// Build a regular line for `product`.
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            unit_price: product.price,
            display_name: product.name.clone(),
            image_url: product.image.clone(),
            is_gift: false,
        }
    }

    /// Build the synthetic gift line: quantity 1, zero price.
    pub fn gift(
        product_id: ProductId,
        display_name: impl Into<String>,
        image_url: impl Into<String>,
        currency: &'static Currency,
    ) -> Self {
        Self {
            product_id,
            quantity: 1,
            unit_price: Money::from_minor(0, currency),
            display_name: display_name.into(),
            image_url: image_url.into(),
            is_gift: true,
        }
    }

    /// Returns the product identifier of the line.
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Returns the line quantity.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }

    /// Returns the unit price snapshot.
    pub fn unit_price(&self) -> &Money<'static, Currency> {
        &self.unit_price
    }

    /// Returns the display name.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the image URL.
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Whether this is the synthetic free-gift line.
    pub fn is_gift(&self) -> bool {
        self.is_gift
    }

    /// Unit price times quantity, in minor units. Saturates on overflow.
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price
            .to_minor_units()
            .saturating_mul(i64::from(self.quantity))
    }

    /// Unit price times quantity.
    pub fn line_total(&self) -> Money<'static, Currency> {
        Money::from_minor(self.line_total_minor(), self.unit_price.currency())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::INR;

    use super::*;

    #[test]
    fn from_product_snapshots_product_fields() {
        let product =
            Product::new("p1", "Tempered Glass", Money::from_minor(49_900, INR)).with_image("g.png");

        let line = CartLineItem::from_product(&product, 3);

        assert_eq!(line.product_id(), &ProductId::from("p1"));
        assert_eq!(line.quantity(), 3);
        assert_eq!(line.display_name(), "Tempered Glass");
        assert_eq!(line.image_url(), "g.png");
        assert!(!line.is_gift(), "product lines are never gift lines");
        assert_eq!(line.line_total(), Money::from_minor(149_700, INR));
    }

    #[test]
    fn gift_line_is_free_and_single() {
        let line = CartLineItem::gift(ProductId::from("gift"), "Kit", "", INR);

        assert!(line.is_gift(), "gift constructor should flag the line");
        assert_eq!(line.quantity(), 1);
        assert_eq!(line.line_total_minor(), 0);
    }
}
