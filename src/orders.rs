//! Orders
//!
//! A durable order is a snapshot of the cart at checkout submission: line
//! items, shipping address and the pricing quote are copied in at creation and
//! never re-derived from live catalog data, so historical orders keep
//! displaying correctly after catalog prices move.
//!
//! State lives in two closed enums: [`PaymentStatus`] driven by the payment
//! gateway, and [`OrderStatus`] driven by fulfilment. Transition rules are
//! enforced by [`service::Orders`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{cart::CartItem, pricing::PricingQuote, prices::Amount, products::ProductId, users::UserId};

pub mod repository;
pub mod service;

/// Identifier of a persisted order, as minted by the backing document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create an order id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        OrderId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        OrderId(id.to_owned())
    }
}

/// Identifier assigned by the payment gateway on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentId(String);

impl PaymentId {
    /// Create a payment id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        PaymentId(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(id: &str) -> Self {
        PaymentId(id.to_owned())
    }
}

/// How the customer chose to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// Hosted payment flow through the external gateway
    Gateway,

    /// Cash on delivery, settled outside the gateway
    CashOnDelivery,
}

/// Payment state of an order.
///
/// `Completed` is reached only through a gateway completion or a
/// cash-on-delivery settlement; `Failed` and `Refunded` are externally
/// triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment
    Pending,

    /// Payment received
    Completed,

    /// Payment attempt failed
    Failed,

    /// Payment returned to the customer
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };

        f.write_str(label)
    }
}

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, not yet confirmed by fulfilment
    Processing,

    /// Confirmed by fulfilment
    Confirmed,

    /// Handed to the carrier
    Shipped,

    /// Delivered to the customer
    Delivered,

    /// Cancelled before delivery
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Processing => "processing",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        };

        f.write_str(label)
    }
}

/// Where an order should be shipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    /// Recipient's full name
    pub full_name: String,

    /// Contact email
    pub email: String,

    /// Contact phone number
    pub phone: String,

    /// Street address
    pub address: String,

    /// City
    pub city: String,

    /// State
    pub state: String,

    /// Postal code
    pub pincode: String,

    /// Country, defaulted when the form leaves it blank
    pub country: String,
}

/// Default country applied when the checkout form leaves it blank.
pub const DEFAULT_COUNTRY: &str = "India";

/// A shipping address with one or more required fields empty.
#[derive(Debug, Error)]
#[error("missing required address fields: {}", fields.join(", "))]
pub struct InvalidAddress {
    /// Names of the empty required fields.
    pub fields: Vec<&'static str>,
}

impl ShippingAddress {
    /// Check that every required field is non-empty after trimming.
    ///
    /// `country` is not required; it is defaulted instead.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidAddress`] listing every empty required field.
    pub fn validate(&self) -> Result<(), InvalidAddress> {
        let required = [
            ("full_name", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
            ("pincode", &self.pincode),
        ];

        let fields: Vec<&'static str> = required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect();

        if fields.is_empty() {
            Ok(())
        } else {
            Err(InvalidAddress { fields })
        }
    }

    /// A copy with the country defaulted if the form left it blank.
    pub fn with_defaulted_country(mut self) -> Self {
        if self.country.trim().is_empty() {
            self.country = DEFAULT_COUNTRY.to_owned();
        }

        self
    }
}

/// Immutable snapshot of a cart line at order-creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// Product id at purchase time
    pub id: ProductId,

    /// Product name at purchase time
    pub name: String,

    /// Unit price at purchase time
    pub price: Amount,

    /// Units purchased
    pub quantity: u32,

    /// Image reference at purchase time
    pub image: String,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        OrderItem {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
            image: item.image.clone(),
        }
    }
}

/// An order as submitted for persistence, before the store mints its id.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Owning user
    pub user_id: UserId,

    /// Snapshot of the cart lines
    pub items: Vec<OrderItem>,

    /// Shipping destination
    pub shipping_address: ShippingAddress,

    /// Totals computed once at checkout
    pub pricing: PricingQuote,

    /// Chosen payment method
    pub payment_method: PaymentMethod,

    /// Submission time
    pub created_at: DateTime<Utc>,
}

/// A durable order record.
#[derive(Debug, Clone)]
pub struct Order {
    /// Order id minted by the backing store
    pub id: OrderId,

    /// Owning user
    pub user_id: UserId,

    /// Snapshot of the cart lines at purchase time
    pub items: Vec<OrderItem>,

    /// Shipping destination
    pub shipping_address: ShippingAddress,

    /// Totals computed once at creation; never recomputed afterwards
    pub pricing: PricingQuote,

    /// Chosen payment method
    pub payment_method: PaymentMethod,

    /// Payment state
    pub payment_status: PaymentStatus,

    /// Gateway payment id, present once payment completes
    pub payment_id: Option<PaymentId>,

    /// Fulfilment state
    pub order_status: OrderStatus,

    /// Carrier tracking number, set by fulfilment
    pub tracking_number: Option<String>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Assemble a freshly created order from its draft and a minted id.
    ///
    /// Initial state is `(Pending, Processing)`.
    pub fn from_draft(id: OrderId, draft: OrderDraft) -> Self {
        Order {
            id,
            user_id: draft.user_id,
            items: draft.items,
            shipping_address: draft.shipping_address,
            pricing: draft.pricing,
            payment_method: draft.payment_method,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            order_status: OrderStatus::Processing,
            tracking_number: None,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    /// Human-facing order reference shown on confirmations.
    ///
    /// Deterministic: the last six digits of the creation timestamp followed
    /// by the first six alphanumeric characters of the id, uppercased.
    pub fn reference(&self) -> String {
        let millis = self.created_at.timestamp_millis().rem_euclid(1_000_000);

        let suffix: String = self
            .id
            .as_str()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(6)
            .collect::<String>()
            .to_uppercase();

        format!("HAM{millis:06}{suffix}")
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
