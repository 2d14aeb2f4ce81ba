//! Checkout
//!
//! Orchestrates a checkout submission end to end with one hard ordering
//! guarantee: the order is durably persisted *before* the payment gateway is
//! invoked, and the cart is cleared only once payment has completed or a
//! cash-on-delivery order has been created. A failure at any point leaves the
//! cart intact, so the shopper's intended purchase is never silently lost.
//!
//! The gateway is modelled as a call returning a completion event rather than
//! a fire-and-forget callback, so payment recording runs uniformly however
//! the UI layer actually receives the gateway's result.

use thiserror::Error;
use tracing::warn;

use crate::{
    cart::{CartStore, SessionCart},
    orders::{
        InvalidAddress, OrderId, PaymentId, PaymentMethod, PaymentStatus, ShippingAddress,
        repository::OrderRepository,
        service::{OrderError, Orders},
    },
    prices::{Amount, AmountError},
    pricing::{PricingError, PricingPolicy},
    users::{ProfileStore, Profiles, UserId},
};

/// What the payment gateway reported for a collection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment went through; the gateway minted this payment id.
    Completed(PaymentId),

    /// The shopper closed the hosted flow without paying.
    Dismissed,

    /// The payment attempt failed inside the gateway.
    Failed,
}

/// Errors from the payment gateway transport itself, as opposed to a payment
/// that ran and did not complete.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The hosted payment flow could not be opened.
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
}

/// Port over the external payment gateway.
pub trait PaymentGateway {
    /// Run the hosted payment flow for an amount against an order reference
    /// and report how it concluded.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the flow could not run at all.
    fn collect(&mut self, amount: Amount, order: &OrderId) -> Result<PaymentOutcome, GatewayError>;
}

/// Why a submitted order is still awaiting payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentInterruption {
    /// The shopper dismissed the hosted flow.
    Dismissed,

    /// The gateway reported a failed attempt.
    Failed,
}

/// How a checkout submission concluded.
///
/// All three variants mean the order exists; only `Paid` and
/// `CashOnDelivery` clear the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Payment completed and was recorded on the order.
    Paid {
        /// The created order
        order_id: OrderId,

        /// Gateway payment id
        payment_id: PaymentId,
    },

    /// Cash-on-delivery order created; payment settles at delivery.
    CashOnDelivery {
        /// The created order
        order_id: OrderId,
    },

    /// The order exists but payment did not complete; the shopper can retry
    /// payment against this same order instead of creating a duplicate.
    PaymentPending {
        /// The created order
        order_id: OrderId,

        /// Why payment did not complete
        interruption: PaymentInterruption,
    },
}

/// Errors that abort a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was reached with an empty cart; callers must redirect back
    /// to the cart page instead of quoting an empty order.
    #[error("cannot check out an empty cart")]
    EmptyCart,

    /// The shipping address is missing required fields.
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    /// The order is not awaiting payment, so there is nothing to retry.
    #[error("order {0} is not awaiting payment")]
    NotAwaitingPayment(OrderId),

    /// Cart subtotal arithmetic failed.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// Quote derivation failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Order creation or payment recording failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The payment gateway could not be reached; the order stays pending.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Checkout orchestrator over the order, profile and gateway ports.
#[derive(Debug)]
pub struct CheckoutFlow<R, P, G> {
    orders: Orders<R>,
    profiles: Profiles<P>,
    gateway: G,
    policy: PricingPolicy,
}

impl<R, P, G> CheckoutFlow<R, P, G>
where
    R: OrderRepository,
    P: ProfileStore,
    G: PaymentGateway,
{
    /// Assemble a checkout flow.
    pub fn new(orders: Orders<R>, profiles: Profiles<P>, gateway: G, policy: PricingPolicy) -> Self {
        CheckoutFlow {
            orders,
            profiles,
            gateway,
            policy,
        }
    }

    /// Submit a checkout: quote the cart, persist the order, then collect
    /// payment.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckoutError`] if any step before or during persistence
    /// fails; in every error case the cart is left intact.
    pub fn submit<S: CartStore>(
        &mut self,
        user: &UserId,
        cart: &mut SessionCart<S>,
        address: &ShippingAddress,
        method: PaymentMethod,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if cart.cart().is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        address.validate()?;

        // Best-effort: losing the remembered address must not block an order.
        if let Err(error) = self.profiles.remember_address(user, address) {
            warn!(%error, "failed to remember shipping address on profile");
        }

        let subtotal = cart.cart().subtotal()?;
        let quote = self.policy.quote(subtotal)?;

        let order_id = self.orders.create(
            user,
            cart.cart().items(),
            address.clone(),
            quote,
            method,
        )?;

        match method {
            PaymentMethod::CashOnDelivery => {
                cart.clear();

                Ok(CheckoutOutcome::CashOnDelivery { order_id })
            }
            PaymentMethod::Gateway => self.collect_and_record(cart, &order_id, quote.total),
        }
    }

    /// Retry payment for an order whose earlier attempt was dismissed or
    /// failed. Runs against the same order; no duplicate is created.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NotAwaitingPayment`] unless the order is a
    /// gateway order still awaiting payment, or another [`CheckoutError`] if
    /// collection or recording fails.
    pub fn retry_payment<S: CartStore>(
        &mut self,
        cart: &mut SessionCart<S>,
        order_id: &OrderId,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let order = self
            .orders
            .get(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.clone()))?;

        let awaiting = order.payment_method == PaymentMethod::Gateway
            && matches!(
                order.payment_status,
                PaymentStatus::Pending | PaymentStatus::Failed
            );

        if !awaiting {
            return Err(CheckoutError::NotAwaitingPayment(order_id.clone()));
        }

        self.collect_and_record(cart, order_id, order.pricing.total)
    }

    /// The order service, for confirmation and history reads.
    pub fn orders(&self) -> &Orders<R> {
        &self.orders
    }

    /// Mutable access to the order service, for fulfilment updates.
    pub fn orders_mut(&mut self) -> &mut Orders<R> {
        &mut self.orders
    }

    fn collect_and_record<S: CartStore>(
        &mut self,
        cart: &mut SessionCart<S>,
        order_id: &OrderId,
        total: Amount,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        match self.gateway.collect(total, order_id)? {
            PaymentOutcome::Completed(payment_id) => {
                self.orders
                    .record_payment_completion(order_id, payment_id.clone())?;

                cart.clear();

                Ok(CheckoutOutcome::Paid {
                    order_id: order_id.clone(),
                    payment_id,
                })
            }
            PaymentOutcome::Dismissed => Ok(CheckoutOutcome::PaymentPending {
                order_id: order_id.clone(),
                interruption: PaymentInterruption::Dismissed,
            }),
            PaymentOutcome::Failed => Ok(CheckoutOutcome::PaymentPending {
                order_id: order_id.clone(),
                interruption: PaymentInterruption::Failed,
            }),
        }
    }
}
