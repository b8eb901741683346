//! Orders: placement, cancellation and fulfillment.

mod commands;
mod service;

pub use commands::{CreateOrder, OrderLineRequest};
pub use service::OrderWorkflow;

use common::{OrderId, ProductId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Order has no lines.
    #[error("An order needs at least one line")]
    NoLines,

    /// A line asked for zero units.
    #[error("Invalid quantity for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// The order total does not fit in the money representation.
    #[error("Order total is too large")]
    TotalOverflow,

    #[error("This order has already been cancelled.")]
    AlreadyCancelled,

    #[error("This order has already been delivered.")]
    AlreadyDelivered,

    #[error("Cannot deliver an order that has not been paid.")]
    NotPaid,
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::NoLines
            | OrderError::InvalidQuantity { .. }
            | OrderError::TotalOverflow => ErrorKind::Invalid,
            OrderError::AlreadyCancelled | OrderError::AlreadyDelivered | OrderError::NotPaid => {
                ErrorKind::Conflict
            }
        }
    }
}
