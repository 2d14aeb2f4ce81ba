//! Products
//!
//! Catalog records are read-only to this crate: they are fetched through the
//! [`crate::catalog`] ports and snapshotted into carts, orders and wishlists.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::{Deserialize, Serialize};

use crate::prices::Amount;

/// Identifier of a catalog product, as minted by the backing document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        ProductId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        ProductId(id.to_owned())
    }
}

/// A catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    /// Product id
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Long description
    pub description: String,

    /// Current selling price
    pub price: Amount,

    /// Price before any discount; greater than `price` implies a discount
    pub original_price: Amount,

    /// Primary image reference
    pub image: String,

    /// Additional image references
    pub images: Vec<String>,

    /// Display category name
    pub category: String,

    /// URL-safe category slug used for filtering
    pub category_slug: String,

    /// Whether the product is featured on the home page
    pub featured: bool,

    /// Average review rating
    pub rating: f64,

    /// Number of reviews
    pub reviews: u32,

    /// Whether the product can currently be purchased
    pub in_stock: bool,

    /// Remaining stock
    pub stock_count: u32,

    /// Optional marketing badge
    pub badge: Option<String>,

    /// Recommended age range
    pub age_range: String,

    /// Brand name
    pub brand: String,

    /// Free-form tags, matched by text search
    pub tags: Vec<String>,

    /// Creation time, used by the newest-first sort
    pub created_at: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Derived discount percentage, rounded to the nearest whole percent.
    ///
    /// `None` unless `original_price` exceeds `price` in the same currency.
    /// This is a display value only and is never stored.
    pub fn discount_percent(&self) -> Option<u32> {
        if self.original_price.currency() != self.price.currency() {
            return None;
        }

        let original = self.original_price.to_minor_units();
        let current = self.price.to_minor_units();

        if original <= current || original == 0 {
            return None;
        }

        let saved = Decimal::from_i64(original - current)?;
        let original = Decimal::from_i64(original)?;

        let percent = (saved / original).checked_mul(Decimal::ONE_HUNDRED)?;

        percent
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
    }
}
