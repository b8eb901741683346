//! Records persisted by the store.
//!
//! Relations are id-based: an order knows its payment by [`PaymentId`] and
//! a payment knows its order by [`OrderId`]; order lines snapshot the product
//! data they need instead of pointing at the product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Money, OrderId, PaymentId, ProductId};

/// Error returned when a stored status string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} status: {value}")]
pub struct ParseStatusError {
    pub kind: &'static str,
    pub value: String,
}

/// A catalog product with its stock counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock_quantity: i64,
}

/// The lifecycle of an order.
///
/// ```text
/// Pending ──┬──► Delivered
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Stock is reserved; awaiting payment and delivery.
    #[default]
    Pending,

    /// Paid and handed over (terminal).
    Delivered,

    /// Stock was returned to the catalog (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(ParseStatusError {
                kind: "order",
                value: other.to_string(),
            }),
        }
    }
}

/// The lifecycle of a payment.
///
/// `Failed` is not terminal: a failed payment can be authorized again.
/// Only `Paid` blocks further authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Returns true if the authorizer may still be consulted.
    pub fn can_authorize(&self) -> bool {
        !matches!(self, PaymentStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(ParseStatusError {
                kind: "payment",
                value: other.to_string(),
            }),
        }
    }
}

/// One line of an order, priced when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Product name at the time the order was placed.
    pub product_name: String,
    pub quantity: u32,
    /// Unit price at the time the order was placed.
    pub unit_price: Money,
}

impl OrderLine {
    /// `quantity * unit_price`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub lines: Vec<OrderLine>,
    /// Fixed when the order is placed; never recomputed.
    pub total: Money,
    pub status: OrderStatus,
    pub payment_id: Option<PaymentId>,
    pub created_at: DateTime<Utc>,
}

/// The payment attached to exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Copied from the order total at creation.
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
