//! Wishlist
//!
//! A per-user set of saved products with one invariant: at most one entry per
//! `(user, product)` pair. The check-then-insert is not transactional; two
//! near-simultaneous adds from different tabs can race a duplicate in, which
//! is why `remove` deletes every matching entry rather than just one.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    persistence::PersistenceError,
    prices::Amount,
    products::{Product, ProductId},
    users::UserId,
};

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// The product is already on the user's wishlist. Callers should treat
    /// this as success; the entry the user wanted exists.
    #[error("product {product} is already on the wishlist of user {user}")]
    DuplicateEntry {
        /// The owning user
        user: UserId,

        /// The product already present
        product: ProductId,
    },

    /// Wrapped backing-store error.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// The product details a wishlist entry snapshots at add time.
#[derive(Debug, Clone)]
pub struct ProductSnapshot {
    /// Product id
    pub id: ProductId,

    /// Product name
    pub name: String,

    /// Price at the time it was saved
    pub price: Amount,

    /// Image reference
    pub image: String,

    /// Rating at the time it was saved
    pub rating: f64,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        ProductSnapshot {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            rating: product.rating,
        }
    }
}

/// A stored wishlist entry.
#[derive(Debug, Clone)]
pub struct WishlistEntry {
    /// Entry id minted by the backing store
    pub id: String,

    /// Owning user
    pub user_id: UserId,

    /// Saved product
    pub product_id: ProductId,

    /// Product name at add time
    pub product_name: String,

    /// Product price at add time
    pub product_price: Amount,

    /// Product image at add time
    pub product_image: String,

    /// Product rating at add time
    pub product_rating: f64,

    /// When the entry was added
    pub added_at: DateTime<Utc>,
}

/// Port over the document store's wishlist records.
pub trait WishlistStore {
    /// Insert an entry.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write fails.
    fn insert(&mut self, entry: WishlistEntry) -> Result<(), PersistenceError>;

    /// Delete every entry for a `(user, product)` pair, returning how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write fails.
    fn delete_all(
        &mut self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<usize, PersistenceError>;

    /// All entries for a `(user, product)` pair.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the read fails.
    fn find(&self, user: &UserId, product: &ProductId)
    -> Result<Vec<WishlistEntry>, PersistenceError>;

    /// All entries for a user, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the read fails.
    fn for_user(&self, user: &UserId) -> Result<Vec<WishlistEntry>, PersistenceError>;
}

/// Wishlist service over a [`WishlistStore`] port.
#[derive(Debug)]
pub struct Wishlist<S> {
    store: S,
}

impl<S: WishlistStore> Wishlist<S> {
    /// Create the service over the given store.
    pub fn new(store: S) -> Self {
        Wishlist { store }
    }

    /// Save a product to a user's wishlist.
    ///
    /// # Errors
    ///
    /// - [`WishlistError::DuplicateEntry`] if the pair already exists.
    /// - A wrapped [`PersistenceError`] if the check or insert fails.
    pub fn add(&mut self, user: &UserId, product: ProductSnapshot) -> Result<(), WishlistError> {
        if !self.store.find(user, &product.id)?.is_empty() {
            return Err(WishlistError::DuplicateEntry {
                user: user.clone(),
                product: product.id,
            });
        }

        self.store.insert(WishlistEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user.clone(),
            product_id: product.id,
            product_name: product.name,
            product_price: product.price,
            product_image: product.image,
            product_rating: product.rating,
            added_at: Utc::now(),
        })?;

        Ok(())
    }

    /// Remove a product from a user's wishlist, deleting every matching
    /// entry so duplicates from the add race get reconciled.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the delete fails.
    pub fn remove(&mut self, user: &UserId, product: &ProductId) -> Result<usize, WishlistError> {
        Ok(self.store.delete_all(user, product)?)
    }

    /// Whether the product is on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the read fails.
    pub fn contains(&self, user: &UserId, product: &ProductId) -> Result<bool, WishlistError> {
        Ok(!self.store.find(user, product)?.is_empty())
    }

    /// The user's wishlist, newest-first by add time.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the read fails.
    pub fn list_for_user(&self, user: &UserId) -> Result<Vec<WishlistEntry>, WishlistError> {
        let mut entries = self.store.for_user(user)?;

        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));

        Ok(entries)
    }

    /// How many products the user has saved.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the read fails.
    pub fn count_for_user(&self, user: &UserId) -> Result<usize, WishlistError> {
        Ok(self.store.for_user(user)?.len())
    }
}

/// In-memory wishlist store for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryWishlistStore {
    entries: Vec<WishlistEntry>,
}

impl WishlistStore for InMemoryWishlistStore {
    fn insert(&mut self, entry: WishlistEntry) -> Result<(), PersistenceError> {
        self.entries.push(entry);

        Ok(())
    }

    fn delete_all(
        &mut self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<usize, PersistenceError> {
        let before = self.entries.len();

        self.entries
            .retain(|entry| !(&entry.user_id == user && &entry.product_id == product));

        Ok(before - self.entries.len())
    }

    fn find(
        &self,
        user: &UserId,
        product: &ProductId,
    ) -> Result<Vec<WishlistEntry>, PersistenceError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| &entry.user_id == user && &entry.product_id == product)
            .cloned()
            .collect())
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<WishlistEntry>, PersistenceError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| &entry.user_id == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso};
    use testresult::TestResult;

    use super::*;

    fn snapshot(id: &str) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::from(id),
            name: format!("product {id}"),
            price: Money::from_minor(999, iso::INR),
            image: format!("{id}.jpg"),
            rating: 4.5,
        }
    }

    fn user() -> UserId {
        UserId::from("user-1")
    }

    #[test]
    fn add_then_contains() -> TestResult {
        let mut wishlist = Wishlist::new(InMemoryWishlistStore::default());

        wishlist.add(&user(), snapshot("a"))?;

        assert!(wishlist.contains(&user(), &ProductId::from("a"))?);
        assert!(!wishlist.contains(&user(), &ProductId::from("b"))?);

        Ok(())
    }

    #[test]
    fn duplicate_add_errors_but_leaves_one_entry() -> TestResult {
        let mut wishlist = Wishlist::new(InMemoryWishlistStore::default());

        wishlist.add(&user(), snapshot("a"))?;

        assert!(matches!(
            wishlist.add(&user(), snapshot("a")),
            Err(WishlistError::DuplicateEntry { .. })
        ));
        assert_eq!(wishlist.count_for_user(&user())?, 1);

        Ok(())
    }

    #[test]
    fn same_product_for_two_users_is_not_a_duplicate() -> TestResult {
        let mut wishlist = Wishlist::new(InMemoryWishlistStore::default());

        wishlist.add(&UserId::from("user-1"), snapshot("a"))?;
        wishlist.add(&UserId::from("user-2"), snapshot("a"))?;

        assert_eq!(wishlist.count_for_user(&UserId::from("user-1"))?, 1);
        assert_eq!(wishlist.count_for_user(&UserId::from("user-2"))?, 1);

        Ok(())
    }

    #[test]
    fn remove_deletes_raced_duplicates() -> TestResult {
        let mut store = InMemoryWishlistStore::default();

        // Two tabs won the check-then-insert race.
        for _ in 0..2 {
            store.insert(WishlistEntry {
                id: Uuid::new_v4().to_string(),
                user_id: user(),
                product_id: ProductId::from("a"),
                product_name: "product a".into(),
                product_price: Money::from_minor(999, iso::INR),
                product_image: "a.jpg".into(),
                product_rating: 4.5,
                added_at: Utc::now(),
            })?;
        }

        let mut wishlist = Wishlist::new(store);

        assert_eq!(wishlist.remove(&user(), &ProductId::from("a"))?, 2);
        assert!(!wishlist.contains(&user(), &ProductId::from("a"))?);

        Ok(())
    }

    #[test]
    fn list_is_newest_first() -> TestResult {
        let mut wishlist = Wishlist::new(InMemoryWishlistStore::default());

        wishlist.add(&user(), snapshot("a"))?;
        wishlist.add(&user(), snapshot("b"))?;
        wishlist.add(&user(), snapshot("c"))?;

        let entries = wishlist.list_for_user(&user())?;
        let ids: Vec<&str> = entries
            .iter()
            .map(|entry| entry.product_id.as_str())
            .collect();

        assert_eq!(ids, vec!["c", "b", "a"]);

        Ok(())
    }

    #[test]
    fn count_ignores_other_users() -> TestResult {
        let mut wishlist = Wishlist::new(InMemoryWishlistStore::default());

        wishlist.add(&UserId::from("user-1"), snapshot("a"))?;
        wishlist.add(&UserId::from("user-2"), snapshot("b"))?;

        assert_eq!(wishlist.count_for_user(&UserId::from("user-1"))?, 1);

        Ok(())
    }
}
