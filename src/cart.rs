//! Cart
//!
//! The cart ledger is session-local: a single browsing session is the only
//! writer, and the ledger survives reloads by writing itself through a
//! client-local storage port after every mutation. Hydration is lenient by
//! policy: absent or corrupt stored state silently becomes an empty cart,
//! never an error shown to a shopper.

use rusty_money::{Money, iso, iso::Currency};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;

use crate::{
    persistence::PersistenceError,
    prices::{Amount, AmountError, line_total, sum_amounts},
    products::{Product, ProductId},
};

/// Errors related to cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// An added item's currency differs from the cart currency.
    #[error("item has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// The subset of a product a cart line needs.
#[derive(Debug, Clone)]
pub struct ProductRef {
    /// Product id
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Unit price
    pub price: Amount,

    /// Image reference
    pub image: String,
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        ProductRef {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
        }
    }
}

/// A cart line: one product and how many units of it.
///
/// `quantity` is always at least one; dropping a line's last unit removes the
/// line instead of storing a zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    /// Product id
    pub id: ProductId,

    /// Product name at the time it was added
    pub name: String,

    /// Unit price at the time it was added
    pub price: Amount,

    /// Image reference
    pub image: String,

    /// Units selected, `>= 1`
    pub quantity: u32,
}

/// The cart ledger: insertion-ordered lines, unique by product id.
#[derive(Debug)]
pub struct Cart {
    items: SmallVec<[CartItem; 8]>,
    currency: &'static Currency,
}

impl Cart {
    /// Create an empty cart in the given currency.
    pub fn new(currency: &'static Currency) -> Self {
        Cart {
            items: SmallVec::new(),
            currency,
        }
    }

    /// Add one unit of a product: increments the existing line's quantity,
    /// or appends a fresh line with quantity one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CurrencyMismatch`] if the product's price is not
    /// in the cart currency.
    pub fn add(&mut self, product: ProductRef) -> Result<(), CartError> {
        let item_currency = product.price.currency();
        if item_currency != self.currency {
            return Err(CartError::CurrencyMismatch(
                item_currency.iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        if let Some(item) = self.items.iter_mut().find(|item| item.id == product.id) {
            item.quantity = item.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem {
                id: product.id,
                name: product.name,
                price: product.price,
                image: product.image,
                quantity: 1,
            });
        }

        Ok(())
    }

    /// Set a line's quantity exactly. Zero removes the line; an unknown id is
    /// a no-op.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: u32) {
        if quantity < 1 {
            self.remove(id);
            return;
        }

        if let Some(item) = self.items.iter_mut().find(|item| &item.id == id) {
            item.quantity = quantity;
        }
    }

    /// Remove a line entirely; a no-op if absent.
    pub fn remove(&mut self, id: &ProductId) {
        self.items.retain(|item| &item.id != id);
    }

    /// Empty the ledger unconditionally.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The lines in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Sum of `price × quantity` across all lines.
    ///
    /// # Errors
    ///
    /// Returns an [`AmountError`] if any line total or the sum overflows.
    pub fn subtotal(&self) -> Result<Amount, AmountError> {
        if self.items.is_empty() {
            return Ok(Money::from_minor(0, self.currency));
        }

        let line_totals = self
            .items
            .iter()
            .map(|item| line_total(&item.price, item.quantity))
            .collect::<Result<Vec<_>, _>>()?;

        sum_amounts(line_totals, self.currency)
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the ledger has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The cart currency.
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }
}

/// Port over the client-local key-value storage a session cart persists into.
pub trait CartStore {
    /// Load the raw stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the storage cannot be read.
    fn load(&self) -> Result<Option<String>, PersistenceError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the storage cannot be written.
    fn save(&mut self, snapshot: &str) -> Result<(), PersistenceError>;

    /// Drop the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the storage cannot be written.
    fn clear(&mut self) -> Result<(), PersistenceError>;
}

/// Serialized form of the ledger written to client-local storage.
#[derive(Debug, Serialize, Deserialize)]
struct CartSnapshot {
    currency: String,
    items: Vec<CartItemSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CartItemSnapshot {
    id: String,
    name: String,
    price: i64,
    image: String,
    quantity: u32,
}

impl CartSnapshot {
    fn of(cart: &Cart) -> Self {
        CartSnapshot {
            currency: cart.currency.iso_alpha_code.to_owned(),
            items: cart
                .items
                .iter()
                .map(|item| CartItemSnapshot {
                    id: item.id.as_str().to_owned(),
                    name: item.name.clone(),
                    price: item.price.to_minor_units(),
                    image: item.image.clone(),
                    quantity: item.quantity,
                })
                .collect(),
        }
    }

    /// Rebuild a cart, or `None` if the snapshot is not usable as-is.
    fn restore(self, currency: &'static Currency) -> Option<Cart> {
        let snapshot_currency = iso::find(&self.currency)?;
        if snapshot_currency != currency {
            return None;
        }

        let mut cart = Cart::new(currency);

        for item in self.items {
            if item.quantity < 1 {
                return None;
            }

            cart.items.push(CartItem {
                id: ProductId::new(item.id),
                name: item.name,
                price: Money::from_minor(item.price, currency),
                image: item.image,
                quantity: item.quantity,
            });
        }

        Some(cart)
    }
}

/// A cart ledger bound to a browsing session, written through to a
/// [`CartStore`] after every mutation.
///
/// Store failures never poison the in-memory ledger; the mutation stands and
/// the failed write is traced.
#[derive(Debug)]
pub struct SessionCart<S> {
    cart: Cart,
    store: S,
}

impl<S: CartStore> SessionCart<S> {
    /// Rebuild the session cart from storage, defaulting to an empty cart if
    /// nothing usable is stored.
    pub fn hydrate(store: S, currency: &'static Currency) -> Self {
        let cart = match store.load() {
            Ok(Some(raw)) => match serde_json::from_str::<CartSnapshot>(&raw) {
                Ok(snapshot) => snapshot.restore(currency).unwrap_or_else(|| {
                    debug!("stored cart did not match session currency; starting empty");
                    Cart::new(currency)
                }),
                Err(error) => {
                    debug!(%error, "stored cart was corrupt; starting empty");
                    Cart::new(currency)
                }
            },
            Ok(None) => Cart::new(currency),
            Err(error) => {
                debug!(%error, "cart storage unreadable; starting empty");
                Cart::new(currency)
            }
        };

        SessionCart { cart, store }
    }

    /// Read access to the underlying ledger.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add one unit of a product and persist the ledger.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] on currency mismatch; the ledger is untouched.
    pub fn add(&mut self, product: ProductRef) -> Result<(), CartError> {
        self.cart.add(product)?;
        self.persist();

        Ok(())
    }

    /// Set a line's quantity exactly and persist the ledger.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: u32) {
        self.cart.update_quantity(id, quantity);
        self.persist();
    }

    /// Remove a line and persist the ledger.
    pub fn remove(&mut self, id: &ProductId) {
        self.cart.remove(id);
        self.persist();
    }

    /// Empty the ledger and drop the stored snapshot.
    pub fn clear(&mut self) {
        self.cart.clear();

        if let Err(error) = self.store.clear() {
            debug!(%error, "failed to clear stored cart");
        }
    }

    fn persist(&mut self) {
        let snapshot = CartSnapshot::of(&self.cart);

        match serde_json::to_string(&snapshot) {
            Ok(raw) => {
                if let Err(error) = self.store.save(&raw) {
                    debug!(%error, "failed to persist cart snapshot");
                }
            }
            Err(error) => debug!(%error, "failed to serialize cart snapshot"),
        }
    }
}

/// In-memory cart store for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    value: Option<String>,
}

impl InMemoryCartStore {
    /// A store pre-seeded with a raw snapshot, for hydration tests.
    pub fn seeded(raw: impl Into<String>) -> Self {
        InMemoryCartStore {
            value: Some(raw.into()),
        }
    }

    /// The currently stored raw snapshot.
    pub fn raw(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl CartStore for InMemoryCartStore {
    fn load(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.value.clone())
    }

    fn save(&mut self, snapshot: &str) -> Result<(), PersistenceError> {
        self.value = Some(snapshot.to_owned());

        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.value = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn product(id: &str, price: i64) -> ProductRef {
        ProductRef {
            id: ProductId::from(id),
            name: format!("product {id}"),
            price: Money::from_minor(price, iso::INR),
            image: format!("{id}.jpg"),
        }
    }

    #[test]
    fn add_new_product_inserts_with_quantity_one() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 1);

        Ok(())
    }

    #[test]
    fn add_same_product_increments_quantity() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.add(product("a", 500))?;

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 2);

        Ok(())
    }

    #[test]
    fn add_foreign_currency_errors() {
        let mut cart = Cart::new(iso::INR);

        let foreign = ProductRef {
            id: ProductId::from("a"),
            name: "imported".into(),
            price: Money::from_minor(500, iso::USD),
            image: "a.jpg".into(),
        };

        assert!(matches!(
            cart.add(foreign),
            Err(CartError::CurrencyMismatch("USD", "INR"))
        ));
    }

    #[test]
    fn update_quantity_sets_exactly() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.update_quantity(&ProductId::from("a"), 5);

        assert_eq!(cart.item_count(), 5);

        Ok(())
    }

    #[test]
    fn update_quantity_zero_removes_line() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.update_quantity(&ProductId::from("a"), 0);

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn update_quantity_unknown_id_is_noop() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.update_quantity(&ProductId::from("missing"), 3);

        assert_eq!(cart.item_count(), 1);

        Ok(())
    }

    #[test]
    fn remove_is_noop_when_absent() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.remove(&ProductId::from("missing"));
        cart.remove(&ProductId::from("a"));
        cart.remove(&ProductId::from("a"));

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn item_count_tracks_mutation_sequences() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.add(product("b", 300))?;
        cart.add(product("a", 500))?;
        cart.update_quantity(&ProductId::from("b"), 4);
        cart.remove(&ProductId::from("a"));

        assert_eq!(cart.item_count(), 4);

        Ok(())
    }

    #[test]
    fn subtotal_is_sum_of_line_totals() -> TestResult {
        let mut cart = Cart::new(iso::INR);

        cart.add(product("a", 500))?;
        cart.add(product("a", 500))?;
        cart.add(product("b", 300))?;

        assert_eq!(cart.subtotal()?, Money::from_minor(1300, iso::INR));

        Ok(())
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() -> TestResult {
        let cart = Cart::new(iso::INR);

        assert_eq!(cart.subtotal()?, Money::from_minor(0, iso::INR));

        Ok(())
    }

    #[test]
    fn session_cart_round_trips_through_storage() -> TestResult {
        let mut session = SessionCart::hydrate(InMemoryCartStore::default(), iso::INR);

        session.add(product("a", 500))?;
        session.add(product("a", 500))?;
        session.add(product("b", 300))?;

        let store = InMemoryCartStore::seeded(session.store.raw().ok_or("no snapshot stored")?);
        let rehydrated = SessionCart::hydrate(store, iso::INR);

        assert_eq!(rehydrated.cart().items(), session.cart().items());
        assert_eq!(rehydrated.cart().item_count(), 3);

        Ok(())
    }

    #[test]
    fn hydrate_discards_corrupt_snapshot() {
        let store = InMemoryCartStore::seeded("{not json");

        let session = SessionCart::hydrate(store, iso::INR);

        assert!(session.cart().is_empty());
    }

    #[test]
    fn hydrate_discards_unknown_currency() {
        let raw = r#"{"currency":"???","items":[]}"#;

        let session = SessionCart::hydrate(InMemoryCartStore::seeded(raw), iso::INR);

        assert!(session.cart().is_empty());
    }

    #[test]
    fn hydrate_discards_zero_quantity_lines() {
        let raw = r#"{"currency":"INR","items":[{"id":"a","name":"a","price":500,"image":"a.jpg","quantity":0}]}"#;

        let session = SessionCart::hydrate(InMemoryCartStore::seeded(raw), iso::INR);

        assert!(session.cart().is_empty());
    }

    #[test]
    fn clear_drops_the_stored_snapshot() -> TestResult {
        let mut session = SessionCart::hydrate(InMemoryCartStore::default(), iso::INR);

        session.add(product("a", 500))?;
        session.clear();

        assert!(session.cart().is_empty());
        assert!(session.store.raw().is_none());

        Ok(())
    }
}
