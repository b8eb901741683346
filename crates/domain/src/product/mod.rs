//! Product catalog maintenance.

mod service;

pub use service::ProductCatalog;

use common::{Money, ProductId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(ProductId),

    #[error("A product named '{0}' already exists.")]
    NameTaken(String),
}

impl ProductError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProductError::NotFound(_) => ErrorKind::NotFound,
            ProductError::NameTaken(_) => ErrorKind::Conflict,
        }
    }
}

/// Fields of a product as supplied by a caller, for create and replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock_quantity: i64,
}
