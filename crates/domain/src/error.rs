//! Domain error types.

use store::StoreError;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::order::OrderError;
use crate::payment::PaymentError;
use crate::product::ProductError;

/// Coarse classification of a failure, independent of any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity does not exist.
    NotFound,
    /// A business rule rejected an otherwise well-formed request.
    Conflict,
    /// The request itself can never succeed as given.
    Invalid,
    /// A collaborator could not give an answer; the caller may retry.
    Unavailable,
    /// Anything else.
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Product(#[from] ProductError),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Inventory(e) => e.kind(),
            DomainError::Order(e) => e.kind(),
            DomainError::Payment(e) => e.kind(),
            DomainError::Product(e) => e.kind(),
            // A concurrent unit of work committed a conflicting row first.
            DomainError::Store(StoreError::UniqueViolation { .. }) => ErrorKind::Conflict,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }
}
