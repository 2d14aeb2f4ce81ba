//! Fallback catalog
//!
//! A fixed local product list served whenever the live catalog query errors
//! or comes back empty, so browsing never shows a hard error. The dataset is
//! bundled as a YAML fixture and parsed once at facade construction.

use chrono::{DateTime, Utc};
use rusty_money::{Money, iso};
use serde::Deserialize;
use thiserror::Error;

use crate::products::{Product, ProductId};

/// Fixture parsing errors.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// YAML parsing error
    #[error("failed to parse fallback catalog: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Unknown currency code
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

#[derive(Debug, Deserialize)]
struct FallbackFile {
    currency: String,
    products: Vec<ProductFixture>,
}

#[derive(Debug, Deserialize)]
struct ProductFixture {
    id: String,
    name: String,
    description: String,
    price: i64,
    original_price: i64,
    image: String,
    #[serde(default)]
    images: Vec<String>,
    category: String,
    category_slug: String,
    featured: bool,
    rating: f64,
    reviews: u32,
    in_stock: bool,
    stock_count: u32,
    badge: Option<String>,
    age_range: String,
    brand: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
}

/// Parse the bundled fallback dataset.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the bundled YAML is malformed or names an
/// unknown currency.
pub fn bundled() -> Result<Vec<Product>, FixtureError> {
    parse(include_str!("fallback.yaml"))
}

fn parse(raw: &str) -> Result<Vec<Product>, FixtureError> {
    let file: FallbackFile = serde_norway::from_str(raw)?;

    let currency =
        iso::find(&file.currency).ok_or_else(|| FixtureError::UnknownCurrency(file.currency))?;

    Ok(file
        .products
        .into_iter()
        .map(|fixture| Product {
            id: ProductId::new(fixture.id),
            name: fixture.name,
            description: fixture.description,
            price: Money::from_minor(fixture.price, currency),
            original_price: Money::from_minor(fixture.original_price, currency),
            image: fixture.image,
            images: fixture.images,
            category: fixture.category,
            category_slug: fixture.category_slug,
            featured: fixture.featured,
            rating: fixture.rating,
            reviews: fixture.reviews,
            in_stock: fixture.in_stock,
            stock_count: fixture.stock_count,
            badge: fixture.badge,
            age_range: fixture.age_range,
            brand: fixture.brand,
            tags: fixture.tags,
            created_at: fixture.created_at,
            updated_at: fixture.created_at,
        })
        .collect())
}
