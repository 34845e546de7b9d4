//! Products

use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque catalog product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (or only whitespace).
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Errors converting a catalog record into a [`Product`].
#[derive(Debug, Error, PartialEq)]
pub enum ProductError {
    /// The record carried neither `_id` nor `id`.
    #[error("product record has no identifier")]
    MissingId,

    /// The record's price is below zero.
    #[error("product {0} has a negative price")]
    NegativePrice(ProductId),

    /// The record's price does not fit into minor units of the currency.
    #[error("product {0} has a price that cannot be represented in minor units")]
    UnrepresentablePrice(ProductId),
}

/// Product as served by the catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    /// Database identifier.
    #[serde(rename = "_id", default)]
    pub object_id: Option<String>,

    /// Plain identifier, used when `_id` is absent.
    #[serde(default)]
    pub id: Option<String>,

    /// Product name
    #[serde(default)]
    pub name: String,

    /// Product price, in major units of the store currency.
    pub price: Decimal,

    /// Product image URL
    #[serde(default)]
    pub image: Option<String>,
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Product price
    pub price: Money<'static, Currency>,

    /// Product image URL
    pub image: String,
}

impl Product {
    /// Create a product without an image.
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Money<'static, Currency>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image: String::new(),
        }
    }

    /// Attach an image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Convert a catalog record, pricing it in `currency`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] when the record has no identifier or an invalid price.
    pub fn from_record(
        record: ProductRecord,
        currency: &'static Currency,
    ) -> Result<Self, ProductError> {
        let id = record
            .object_id
            .or(record.id)
            .map(ProductId::from)
            .filter(|id| !id.is_empty())
            .ok_or(ProductError::MissingId)?;

        if record.price.is_sign_negative() && !record.price.is_zero() {
            return Err(ProductError::NegativePrice(id));
        }

        let Some(minor) = decimal_to_minor(record.price, currency) else {
            return Err(ProductError::UnrepresentablePrice(id));
        };

        Ok(Self {
            id,
            name: record.name,
            price: Money::from_minor(minor, currency),
            image: record.image.unwrap_or_default(),
        })
    }
}

/// Convert a major-unit decimal amount into minor units of `currency`.
///
/// Rounds half away from zero. Returns `None` on overflow.
pub fn decimal_to_minor(amount: Decimal, currency: &Currency) -> Option<i64> {
    let scale = Decimal::from(10_i64.checked_pow(currency.exponent)?);

    amount
        .checked_mul(scale)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Catalog snapshot indexed by product identifier.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    products: FxHashMap<ProductId, Product>,
}

impl CatalogIndex {
    /// Look up a product.
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }

    /// Number of products in the snapshot.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for CatalogIndex {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self {
            products: iter
                .into_iter()
                .map(|product| (product.id.clone(), product))
                .collect(),
        }
    }
}
