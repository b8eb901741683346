//! Order fulfillment domain.
//!
//! This crate provides the workflows that keep stock, orders and payments
//! consistent with one another:
//! - [`InventoryLedger`] reserves and releases per-product stock
//! - [`OrderWorkflow`] places, cancels and fulfills orders
//! - [`PaymentWorkflow`] creates payments and authorizes them against a
//!   [`PaymentAuthorizer`]
//! - [`ProductCatalog`] maintains the products that orders draw from
//!
//! Every mutating operation runs inside a single store unit of work and
//! commits only after all of its checks have passed.

pub mod error;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod product;

pub use error::{DomainError, ErrorKind};
pub use inventory::{InventoryError, InventoryLedger, Reservation};
pub use order::{CreateOrder, OrderError, OrderLineRequest, OrderWorkflow};
pub use payment::{
    AuthorizationOutcome, AuthorizationRequest, AuthorizerError, InMemoryPaymentAuthorizer,
    PaymentAuthorizer, PaymentError, PaymentWorkflow,
};
pub use product::{NewProduct, ProductCatalog, ProductError};
