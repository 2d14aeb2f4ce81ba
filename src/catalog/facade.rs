//! Catalog facade
//!
//! Translates a [`CatalogFilter`] into store queries and guarantees the
//! browsing UI never sees a hard error: store failures and empty results are
//! absorbed by the fallback dataset. Degradation is traced, not surfaced.

use tracing::debug;

use crate::{
    catalog::{
        CatalogFilter, CatalogPage, ContinuationToken, matches_filter, matches_search,
        sort_products,
    },
    catalog::fallback::{self, FixtureError},
    persistence::PersistenceError,
    products::Product,
};

/// Port over the document store's product records.
///
/// Implementations handle only the indexable part of a filter: category,
/// price bounds and the stock flag, in the filter's sort order, starting
/// strictly after the cursor. Text search is the facade's job.
pub trait CatalogStore {
    /// Fetch up to `limit` matching products.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the query fails.
    fn fetch(
        &self,
        filter: &CatalogFilter,
        after: Option<&ContinuationToken>,
        limit: usize,
    ) -> Result<Vec<Product>, PersistenceError>;

    /// Fetch every product, for the category and price-range scans.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the query fails.
    fn all(&self) -> Result<Vec<Product>, PersistenceError>;
}

/// Catalog read facade over a [`CatalogStore`] port and a fallback dataset.
#[derive(Debug)]
pub struct Catalog<S> {
    store: S,
    fallback: Vec<Product>,
}

impl<S: CatalogStore> Catalog<S> {
    /// Create a facade with an explicit fallback dataset.
    pub fn new(store: S, fallback: Vec<Product>) -> Self {
        Catalog { store, fallback }
    }

    /// Create a facade backed by the bundled fallback dataset.
    ///
    /// # Errors
    ///
    /// Returns a [`FixtureError`] if the bundled fixture fails to parse.
    pub fn with_bundled_fallback(store: S) -> Result<Self, FixtureError> {
        Ok(Catalog {
            store,
            fallback: fallback::bundled()?,
        })
    }

    /// Query one page of products. Infallible by design: store failures and
    /// empty results serve the fallback dataset instead.
    ///
    /// The cursor is derived from the fetched page *before* text search
    /// trims it, so an under-filled page still continues from the right
    /// position.
    pub fn query(
        &self,
        filter: &CatalogFilter,
        page_size: usize,
        after: Option<&ContinuationToken>,
    ) -> CatalogPage {
        match self.store.fetch(filter, after, page_size.saturating_add(1)) {
            Ok(rows) if !rows.is_empty() => {
                let has_more = rows.len() > page_size;
                let mut products: Vec<Product> = rows.into_iter().take(page_size).collect();

                let next_token = if has_more {
                    products
                        .last()
                        .map(|last| ContinuationToken::after(last, filter.sort))
                } else {
                    None
                };

                if let Some(needle) = &filter.search {
                    products.retain(|product| matches_search(product, needle));
                }

                CatalogPage {
                    products,
                    has_more,
                    next_token,
                }
            }
            Ok(_) => {
                debug!("catalog query returned no rows; serving fallback dataset");
                self.fallback_page(filter, page_size, after)
            }
            Err(error) => {
                debug!(%error, "catalog query failed; serving fallback dataset");
                self.fallback_page(filter, page_size, after)
            }
        }
    }

    /// Distinct category `(name, slug)` pairs, sorted by name.
    ///
    /// Served from the fallback dataset if the store scan fails.
    pub fn categories(&self) -> Vec<(String, String)> {
        let products = self.all_or_fallback();

        let mut categories: Vec<(String, String)> = products
            .iter()
            .map(|product| (product.category.clone(), product.category_slug.clone()))
            .collect();

        categories.sort();
        categories.dedup();

        categories
    }

    /// Minimum and maximum product price in minor units, for filter sliders.
    ///
    /// Served from the fallback dataset if the store scan fails; `None` only
    /// when both sources are empty.
    pub fn price_range(&self) -> Option<(i64, i64)> {
        let products = self.all_or_fallback();

        let prices: Vec<i64> = products
            .iter()
            .map(|product| product.price.to_minor_units())
            .collect();

        Some((
            prices.iter().copied().min()?,
            prices.iter().copied().max()?,
        ))
    }

    fn all_or_fallback(&self) -> Vec<Product> {
        match self.store.all() {
            Ok(products) if !products.is_empty() => products,
            Ok(_) => self.fallback.clone(),
            Err(error) => {
                debug!(%error, "catalog scan failed; serving fallback dataset");
                self.fallback.clone()
            }
        }
    }

    fn fallback_page(
        &self,
        filter: &CatalogFilter,
        page_size: usize,
        after: Option<&ContinuationToken>,
    ) -> CatalogPage {
        let mut products: Vec<Product> = self
            .fallback
            .iter()
            .filter(|product| matches_filter(product, filter))
            .cloned()
            .collect();

        if let Some(needle) = &filter.search {
            products.retain(|product| matches_search(product, needle));
        }

        sort_products(&mut products, filter.sort);

        if let Some(state) = after.and_then(ContinuationToken::state) {
            products.retain(|product| state.precedes(product));
        }

        let has_more = products.len() > page_size;
        products.truncate(page_size);

        let next_token = if has_more {
            products
                .last()
                .map(|last| ContinuationToken::after(last, filter.sort))
        } else {
            None
        };

        CatalogPage {
            products,
            has_more,
            next_token,
        }
    }
}

/// In-memory catalog store for tests and demos.
///
/// Uses the same shared predicate and sort functions as the facade's
/// fallback path.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    products: Vec<Product>,
}

impl InMemoryCatalogStore {
    /// A store holding the given products.
    pub fn with_products(products: Vec<Product>) -> Self {
        InMemoryCatalogStore { products }
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn fetch(
        &self,
        filter: &CatalogFilter,
        after: Option<&ContinuationToken>,
        limit: usize,
    ) -> Result<Vec<Product>, PersistenceError> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|product| matches_filter(product, filter))
            .cloned()
            .collect();

        sort_products(&mut products, filter.sort);

        if let Some(state) = after.and_then(ContinuationToken::state) {
            products.retain(|product| state.precedes(product));
        }

        products.truncate(limit);

        Ok(products)
    }

    fn all(&self) -> Result<Vec<Product>, PersistenceError> {
        Ok(self.products.clone())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rusty_money::{Money, iso};
    use testresult::TestResult;

    use crate::{catalog::SortKey, products::ProductId};

    use super::*;

    /// A store that always fails, to exercise the fallback path.
    #[derive(Debug)]
    struct BrokenStore;

    impl CatalogStore for BrokenStore {
        fn fetch(
            &self,
            _filter: &CatalogFilter,
            _after: Option<&ContinuationToken>,
            _limit: usize,
        ) -> Result<Vec<Product>, PersistenceError> {
            Err(PersistenceError::Unavailable("down for maintenance".into()))
        }

        fn all(&self) -> Result<Vec<Product>, PersistenceError> {
            Err(PersistenceError::Unavailable("down for maintenance".into()))
        }
    }

    fn product(id: &str, name: &str, price: i64, day: u32) -> Product {
        let created_at = Utc
            .with_ymd_and_hms(2024, 2, day, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Product {
            id: ProductId::from(id),
            name: name.into(),
            description: format!("{name} description"),
            price: Money::from_minor(price, iso::INR),
            original_price: Money::from_minor(price, iso::INR),
            image: format!("{id}.jpg"),
            images: Vec::new(),
            category: "Toys".into(),
            category_slug: "toys".into(),
            featured: false,
            rating: 4.0,
            reviews: 1,
            in_stock: true,
            stock_count: 3,
            badge: None,
            age_range: "3+ years".into(),
            brand: "Acme".into(),
            tags: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    fn live_products() -> Vec<Product> {
        (1..=5)
            .map(|n| {
                product(
                    &format!("p{n}"),
                    &format!("Item {n}"),
                    i64::from(n) * 100,
                    n,
                )
            })
            .collect()
    }

    #[test]
    fn pages_continue_through_tokens_without_overlap() {
        let catalog = Catalog::new(
            InMemoryCatalogStore::with_products(live_products()),
            Vec::new(),
        );

        let filter = CatalogFilter {
            sort: SortKey::PriceAscending,
            ..CatalogFilter::default()
        };

        let first = catalog.query(&filter, 2, None);
        assert_eq!(first.products.len(), 2);
        assert!(first.has_more);

        let token = match first.next_token {
            Some(token) => token,
            None => panic!("expected a continuation token"),
        };

        let second = catalog.query(&filter, 2, Some(&token));
        let ids: Vec<&str> = second.products.iter().map(|p| p.id.as_str()).collect();

        assert_eq!(ids, vec!["p3", "p4"]);
        assert!(second.has_more);
    }

    #[test]
    fn last_page_has_no_token() {
        let catalog = Catalog::new(
            InMemoryCatalogStore::with_products(live_products()),
            Vec::new(),
        );

        let filter = CatalogFilter {
            sort: SortKey::PriceAscending,
            ..CatalogFilter::default()
        };

        let page = catalog.query(&filter, 10, None);

        assert_eq!(page.products.len(), 5);
        assert!(!page.has_more);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn search_can_under_fill_a_page_but_keeps_paging_state() {
        let catalog = Catalog::new(
            InMemoryCatalogStore::with_products(live_products()),
            Vec::new(),
        );

        let filter = CatalogFilter {
            search: Some("Item 3".into()),
            sort: SortKey::PriceAscending,
            ..CatalogFilter::default()
        };

        let page = catalog.query(&filter, 2, None);

        // The store page held p1 and p2; neither survives the search, but
        // more rows exist past the cursor.
        assert!(page.products.is_empty());
        assert!(page.has_more);
        assert!(page.next_token.is_some());
    }

    #[test]
    fn broken_store_serves_fallback() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(BrokenStore)?;

        let page = catalog.query(&CatalogFilter::default(), 20, None);

        assert_eq!(page.products.len(), 8);
        assert!(!page.has_more);

        Ok(())
    }

    #[test]
    fn empty_store_serves_fallback() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(InMemoryCatalogStore::default())?;

        let page = catalog.query(&CatalogFilter::default(), 20, None);

        assert_eq!(page.products.len(), 8);

        Ok(())
    }

    #[test]
    fn fallback_applies_the_same_filters() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(BrokenStore)?;

        let filter = CatalogFilter {
            in_stock: Some(true),
            max_price: Some(1000),
            sort: SortKey::PriceAscending,
            ..CatalogFilter::default()
        };

        let page = catalog.query(&filter, 20, None);
        let prices: Vec<i64> = page
            .products
            .iter()
            .map(|p| p.price.to_minor_units())
            .collect();

        assert_eq!(prices, vec![799, 899]);

        Ok(())
    }

    #[test]
    fn fallback_search_matches_tags() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(BrokenStore)?;

        let filter = CatalogFilter {
            search: Some("educational".into()),
            ..CatalogFilter::default()
        };

        let page = catalog.query(&filter, 20, None);

        assert!(!page.products.is_empty());
        assert!(
            page.products
                .iter()
                .all(|p| crate::catalog::matches_search(p, "educational")),
            "every fallback result must match the search"
        );

        Ok(())
    }

    #[test]
    fn fallback_pages_with_tokens() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(BrokenStore)?;

        let filter = CatalogFilter {
            sort: SortKey::PriceAscending,
            ..CatalogFilter::default()
        };

        let first = catalog.query(&filter, 3, None);
        assert_eq!(first.products.len(), 3);
        assert!(first.has_more);

        let token = match first.next_token {
            Some(token) => token,
            None => panic!("expected a continuation token"),
        };

        let second = catalog.query(&filter, 3, Some(&token));

        assert_eq!(second.products.len(), 3);

        let first_ids: Vec<&str> = first.products.iter().map(|p| p.id.as_str()).collect();
        let second_ids: Vec<&str> = second.products.iter().map(|p| p.id.as_str()).collect();

        assert!(
            second_ids.iter().all(|id| !first_ids.contains(id)),
            "pages must not overlap"
        );

        Ok(())
    }

    #[test]
    fn categories_come_from_fallback_when_store_is_down() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(BrokenStore)?;

        let categories = catalog.categories();

        assert_eq!(categories.len(), 8);
        assert!(
            categories
                .iter()
                .any(|(name, slug)| name == "Puzzles" && slug == "puzzles"),
            "expected the puzzles category"
        );

        Ok(())
    }

    #[test]
    fn price_range_spans_the_dataset() -> TestResult {
        let catalog = Catalog::with_bundled_fallback(BrokenStore)?;

        assert_eq!(catalog.price_range(), Some((799, 4999)));

        Ok(())
    }

    #[test]
    fn price_range_of_nothing_is_none() {
        let catalog = Catalog::new(BrokenStore, Vec::new());

        assert_eq!(catalog.price_range(), None);
    }
}
