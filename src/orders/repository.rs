//! Order repository port
//!
//! Orders live in an external document store; this crate only defines the port
//! and an in-memory implementation for tests and demos. The store mints ids,
//! mirroring how document databases assign them on insert.

use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::{
    orders::{Order, OrderDraft, OrderId},
    persistence::PersistenceError,
    users::UserId,
};

/// Port over the document store's order records.
pub trait OrderRepository {
    /// Persist a draft and return the minted order id.
    ///
    /// Either the order fully exists afterwards or it does not; a failed
    /// insert must leave no partial record behind.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write cannot complete.
    fn insert(&mut self, draft: OrderDraft) -> Result<OrderId, PersistenceError>;

    /// Fetch an order by id.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the read fails.
    fn get(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError>;

    /// Fetch all orders owned by a user, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the read fails.
    fn for_user(&self, user: &UserId) -> Result<Vec<Order>, PersistenceError>;

    /// Replace a stored order record.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the write cannot complete.
    fn update(&mut self, order: &Order) -> Result<(), PersistenceError>;
}

/// In-memory order store for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: FxHashMap<OrderId, Order>,
}

impl OrderRepository for InMemoryOrderStore {
    fn insert(&mut self, draft: OrderDraft) -> Result<OrderId, PersistenceError> {
        let id = OrderId::new(Uuid::new_v4().to_string());
        let order = Order::from_draft(id.clone(), draft);

        self.orders.insert(id.clone(), order);

        Ok(id)
    }

    fn get(&self, id: &OrderId) -> Result<Option<Order>, PersistenceError> {
        Ok(self.orders.get(id).cloned())
    }

    fn for_user(&self, user: &UserId) -> Result<Vec<Order>, PersistenceError> {
        Ok(self
            .orders
            .values()
            .filter(|order| &order.user_id == user)
            .cloned()
            .collect())
    }

    fn update(&mut self, order: &Order) -> Result<(), PersistenceError> {
        if !self.orders.contains_key(&order.id) {
            return Err(PersistenceError::Rejected(format!(
                "no order {} to update",
                order.id
            )));
        }

        self.orders.insert(order.id.clone(), order.clone());

        Ok(())
    }
}
