//! Order lifecycle
//!
//! The service owns every transition an order can make after creation. The
//! caller is trusted to have validated its inputs (address validation lives in
//! [`crate::orders::ShippingAddress::validate`], empty-cart guarding in
//! [`crate::checkout`]); what is enforced here is the integrity of the state
//! machine itself.
//!
//! Payment-completion recording is the reconciliation-critical path: by the
//! time it runs, money has already moved at the gateway, so failures are
//! logged loudly before being returned for the caller to retry.

use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::{
    cart::CartItem,
    orders::{
        Order, OrderDraft, OrderId, OrderItem, OrderStatus, PaymentId, PaymentMethod,
        PaymentStatus, ShippingAddress, repository::OrderRepository,
    },
    persistence::PersistenceError,
    pricing::PricingQuote,
    users::UserId,
};

/// Errors from order lifecycle operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order id does not exist in the backing store.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// A completion arrived for an order already completed with a different
    /// payment id; possible double charge, refused and left for manual
    /// reconciliation.
    #[error("order {order} already completed with payment {existing}, refusing {offered}")]
    PaymentIdMismatch {
        /// The order in question
        order: OrderId,

        /// Payment id already recorded
        existing: PaymentId,

        /// Conflicting payment id that was offered
        offered: PaymentId,
    },

    /// The requested payment transition is not allowed from the current state.
    #[error("cannot move payment status from {from} to {to}")]
    InvalidPaymentTransition {
        /// Current payment status
        from: PaymentStatus,

        /// Requested payment status
        to: PaymentStatus,
    },

    /// Wrapped backing-store error.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Order lifecycle service over an [`OrderRepository`] port.
#[derive(Debug)]
pub struct Orders<R> {
    repo: R,
}

impl<R: OrderRepository> Orders<R> {
    /// Create the service over the given repository.
    pub fn new(repo: R) -> Self {
        Orders { repo }
    }

    /// Create an order from a cart snapshot.
    ///
    /// The cart lines are copied into immutable [`OrderItem`]s, the quote is
    /// stored as-is, and the initial state is `(Pending, Processing)`. The
    /// caller must not clear the cart or invoke the payment gateway until
    /// this has returned successfully.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the insert fails; nothing is
    /// persisted in that case.
    pub fn create(
        &mut self,
        user: &UserId,
        items: &[CartItem],
        shipping_address: ShippingAddress,
        pricing: PricingQuote,
        payment_method: PaymentMethod,
    ) -> Result<OrderId, OrderError> {
        let draft = OrderDraft {
            user_id: user.clone(),
            items: items.iter().map(OrderItem::from).collect(),
            shipping_address: shipping_address.with_defaulted_country(),
            pricing,
            payment_method,
            created_at: Utc::now(),
        };

        Ok(self.repo.insert(draft)?)
    }

    /// Record a payment completion reported by the gateway.
    ///
    /// Idempotent for retries: a repeat call with the payment id already on
    /// the order is a no-op. A different payment id on a completed order is
    /// refused as a possible double charge.
    ///
    /// # Errors
    ///
    /// - [`OrderError::NotFound`] if the order does not exist.
    /// - [`OrderError::PaymentIdMismatch`] on a conflicting repeat completion.
    /// - [`OrderError::InvalidPaymentTransition`] if the order was refunded.
    /// - A wrapped [`PersistenceError`] if the update fails; the payment has
    ///   already succeeded at the gateway, so callers should retry rather
    ///   than surface this to the shopper.
    pub fn record_payment_completion(
        &mut self,
        id: &OrderId,
        payment_id: PaymentId,
    ) -> Result<(), OrderError> {
        let mut order = self.fetch(id)?;

        match order.payment_status {
            PaymentStatus::Completed => {
                return match &order.payment_id {
                    Some(existing) if existing == &payment_id => Ok(()),
                    Some(existing) => {
                        warn!(
                            order = %id,
                            existing = %existing,
                            offered = %payment_id,
                            "conflicting payment completion refused"
                        );

                        Err(OrderError::PaymentIdMismatch {
                            order: id.clone(),
                            existing: existing.clone(),
                            offered: payment_id,
                        })
                    }
                    // Completed without a payment id is a cash settlement;
                    // a gateway completion on top of it is a conflict.
                    None => Err(OrderError::InvalidPaymentTransition {
                        from: PaymentStatus::Completed,
                        to: PaymentStatus::Completed,
                    }),
                };
            }
            PaymentStatus::Refunded => {
                return Err(OrderError::InvalidPaymentTransition {
                    from: PaymentStatus::Refunded,
                    to: PaymentStatus::Completed,
                });
            }
            PaymentStatus::Pending | PaymentStatus::Failed => {}
        }

        order.payment_status = PaymentStatus::Completed;
        order.payment_id = Some(payment_id);
        order.updated_at = Utc::now();

        if let Err(error) = self.repo.update(&order) {
            warn!(
                order = %id,
                %error,
                "failed to record payment completion; needs manual reconciliation"
            );

            return Err(error.into());
        }

        Ok(())
    }

    /// Record that a payment attempt failed. Idempotent if already failed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidPaymentTransition`] unless the order is
    /// pending or already failed, [`OrderError::NotFound`] for an unknown id,
    /// or a wrapped [`PersistenceError`] if the update fails.
    pub fn record_payment_failure(&mut self, id: &OrderId) -> Result<(), OrderError> {
        self.transition_payment(id, PaymentStatus::Failed, &[PaymentStatus::Pending])
    }

    /// Record that a completed payment was refunded. Idempotent if already
    /// refunded.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidPaymentTransition`] unless the order is
    /// completed or already refunded, [`OrderError::NotFound`] for an unknown
    /// id, or a wrapped [`PersistenceError`] if the update fails.
    pub fn record_refund(&mut self, id: &OrderId) -> Result<(), OrderError> {
        self.transition_payment(id, PaymentStatus::Refunded, &[PaymentStatus::Completed])
    }

    /// Settle a cash-on-delivery order without a gateway payment id.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidPaymentTransition`] unless the order is
    /// pending, [`OrderError::NotFound`] for an unknown id, or a wrapped
    /// [`PersistenceError`] if the update fails.
    pub fn record_cash_settlement(&mut self, id: &OrderId) -> Result<(), OrderError> {
        self.transition_payment(id, PaymentStatus::Completed, &[PaymentStatus::Pending])
    }

    /// Update fulfilment state and, optionally, the tracking number.
    ///
    /// Later stages are driven by fulfilment operations outside this crate;
    /// no transition graph is enforced between fulfilment states.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] for an unknown id, or a wrapped
    /// [`PersistenceError`] if the update fails.
    pub fn update_fulfilment(
        &mut self,
        id: &OrderId,
        status: OrderStatus,
        tracking_number: Option<String>,
    ) -> Result<(), OrderError> {
        let mut order = self.fetch(id)?;

        order.order_status = status;
        if tracking_number.is_some() {
            order.tracking_number = tracking_number;
        }
        order.updated_at = Utc::now();

        Ok(self.repo.update(&order)?)
    }

    /// Fetch an order by id.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the read fails.
    pub fn get(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.repo.get(id)?)
    }

    /// All orders owned by a user, strictly newest-first by creation time.
    ///
    /// Orders with failed payments are included; history hides nothing.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PersistenceError`] if the read fails.
    pub fn for_user(&self, user: &UserId) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.repo.for_user(user)?;

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(orders)
    }

    fn fetch(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.repo
            .get(id)?
            .ok_or_else(|| OrderError::NotFound(id.clone()))
    }

    fn transition_payment(
        &mut self,
        id: &OrderId,
        to: PaymentStatus,
        allowed_from: &[PaymentStatus],
    ) -> Result<(), OrderError> {
        let mut order = self.fetch(id)?;

        if order.payment_status == to {
            return Ok(());
        }

        if !allowed_from.contains(&order.payment_status) {
            return Err(OrderError::InvalidPaymentTransition {
                from: order.payment_status,
                to,
            });
        }

        order.payment_status = to;
        order.updated_at = Utc::now();

        Ok(self.repo.update(&order)?)
    }
}
