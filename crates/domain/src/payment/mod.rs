//! Payments: creation and authorization against an external oracle.

mod authorizer;
mod service;

pub use authorizer::{
    AuthorizationOutcome, AuthorizationRequest, AuthorizerError, InMemoryPaymentAuthorizer,
    PaymentAuthorizer,
};
pub use service::PaymentWorkflow;

use common::{OrderId, PaymentId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during payment operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    #[error("This order already has a payment request.")]
    AlreadyExists { order_id: OrderId },

    #[error("Payment for this order has already been made and validated.")]
    AlreadyPaid,

    #[error("The payment is not authorized by provider.")]
    NotAuthorized,

    /// The authorizer gave no usable answer. The payment is unchanged.
    #[error("Payment authorizer unavailable: {0}")]
    AuthorizerUnavailable(String),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::OrderNotFound(_) | PaymentError::NotFound(_) => ErrorKind::NotFound,
            PaymentError::AlreadyExists { .. }
            | PaymentError::AlreadyPaid
            | PaymentError::NotAuthorized => ErrorKind::Conflict,
            PaymentError::AuthorizerUnavailable(_) => ErrorKind::Unavailable,
        }
    }
}
