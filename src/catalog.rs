//! Catalog
//!
//! Read path for product browsing. The backing document store handles the
//! indexable part of a query (category, price bounds, stock, sort, cursor);
//! free-text search is applied in memory afterwards because the store's text
//! search is too limited. One set of pure predicate and sort functions serves
//! both the live post-processing and the fallback dataset, so the two paths
//! cannot drift apart.

use std::cmp::Ordering;

use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::ToPrimitive,
};
use serde::{Deserialize, Serialize};

use crate::products::Product;

pub mod facade;
pub mod fallback;

/// Sort order for catalog queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Cheapest first
    PriceAscending,

    /// Most expensive first
    PriceDescending,

    /// Most recently added first
    #[default]
    Newest,

    /// Highest rated first
    RatingDescending,

    /// Alphabetical by name
    NameAscending,
}

/// A catalog query: all present fields must match (conjunctive).
///
/// Price bounds are inclusive, in minor units.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Category slug to match exactly
    pub category: Option<String>,

    /// Inclusive lower price bound, minor units
    pub min_price: Option<i64>,

    /// Inclusive upper price bound, minor units
    pub max_price: Option<i64>,

    /// Match the stock flag exactly
    pub in_stock: Option<bool>,

    /// Case-insensitive substring matched against name, description and tags
    pub search: Option<String>,

    /// Sort order
    pub sort: SortKey,
}

/// One page of catalog results.
///
/// `products` can hold fewer than the requested page size even when
/// `has_more` is true: text search filters a fetched page in memory, so a
/// page can under-fill while later matches still exist.
#[derive(Debug)]
pub struct CatalogPage {
    /// Products on this page, in sort order
    pub products: Vec<Product>,

    /// Whether the store had rows beyond this page
    pub has_more: bool,

    /// Cursor for the next page, when one exists
    pub next_token: Option<ContinuationToken>,
}

/// Does a product match the bounded (indexable) part of a filter?
///
/// Text search is deliberately excluded; see [`matches_search`].
pub fn matches_filter(product: &Product, filter: &CatalogFilter) -> bool {
    if let Some(category) = &filter.category {
        if &product.category_slug != category {
            return false;
        }
    }

    let price = product.price.to_minor_units();

    if let Some(min) = filter.min_price {
        if price < min {
            return false;
        }
    }

    if let Some(max) = filter.max_price {
        if price > max {
            return false;
        }
    }

    if let Some(in_stock) = filter.in_stock {
        if product.in_stock != in_stock {
            return false;
        }
    }

    true
}

/// Case-insensitive substring match against name, description and tags.
pub fn matches_search(product: &Product, needle: &str) -> bool {
    let needle = needle.to_lowercase();

    product.name.to_lowercase().contains(&needle)
        || product.description.to_lowercase().contains(&needle)
        || product
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Compare two products under a sort key, tie-broken by id so the order is
/// total and cursors are stable.
pub fn compare(a: &Product, b: &Product, sort: SortKey) -> Ordering {
    let ordering = sort_value(a, sort).cmp(&sort_value(b, sort));

    let ordering = if descending(sort) {
        ordering.reverse()
    } else {
        ordering
    };

    ordering.then_with(|| a.id.as_str().cmp(b.id.as_str()))
}

/// Sort products in place under a sort key.
pub fn sort_products(products: &mut [Product], sort: SortKey) {
    products.sort_by(|a, b| compare(a, b, sort));
}

/// Opaque pagination cursor: the last-seen sort position, not a numeric
/// offset. Offsets are unstable under the backing store's cursor model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken(String);

/// What a token encodes: the sort in effect and the last-seen position.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TokenState {
    sort: SortKey,
    value: SortValue,
    id: String,
}

/// Comparable image of a product under one sort key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
enum SortValue {
    Int(i64),
    Text(String),
}

impl ContinuationToken {
    /// The cursor pointing just past the given product under a sort.
    pub fn after(product: &Product, sort: SortKey) -> Self {
        let state = TokenState {
            sort,
            value: sort_value(product, sort),
            id: product.id.as_str().to_owned(),
        };

        // TokenState always serializes; its fields are plain data.
        let raw = serde_json::to_string(&state).unwrap_or_default();

        ContinuationToken(raw)
    }

    /// Rebuild a token from its raw form, as handed back by a client.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        ContinuationToken(raw.into())
    }

    /// The raw form to hand to a client.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the token. A malformed token decodes to `None` and is treated
    /// as "start from the beginning" rather than an error.
    pub(crate) fn state(&self) -> Option<TokenState> {
        serde_json::from_str(&self.0).ok()
    }
}

impl TokenState {
    /// Is this product strictly after the token position in sort order?
    pub(crate) fn precedes(&self, product: &Product) -> bool {
        let ordering = self.value.cmp(&sort_value(product, self.sort));

        let ordering = if descending(self.sort) {
            ordering.reverse()
        } else {
            ordering
        };

        match ordering {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.id.as_str() < product.id.as_str(),
        }
    }
}

fn sort_value(product: &Product, sort: SortKey) -> SortValue {
    match sort {
        SortKey::PriceAscending | SortKey::PriceDescending => {
            SortValue::Int(product.price.to_minor_units())
        }
        SortKey::Newest => SortValue::Int(product.created_at.timestamp_millis()),
        SortKey::RatingDescending => SortValue::Int(milli_rating(product.rating)),
        SortKey::NameAscending => SortValue::Text(product.name.clone()),
    }
}

fn descending(sort: SortKey) -> bool {
    matches!(
        sort,
        SortKey::PriceDescending | SortKey::Newest | SortKey::RatingDescending
    )
}

/// Ratings are compared in thousandths to keep the sort value integral.
/// Non-finite ratings sort as zero.
fn milli_rating(rating: f64) -> i64 {
    Decimal::from_f64_retain(rating)
        .and_then(|rating| rating.checked_mul(Decimal::ONE_THOUSAND))
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|rounded| rounded.to_i64())
        .unwrap_or(0)
}
