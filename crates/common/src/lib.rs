//! Shared types for the shop workspace.
//!
//! Everything in here is plain data: typed identifiers, exact money,
//! paging envelopes and the records persisted by the store. Behavior
//! lives in the `domain` crate.

pub mod model;
pub mod money;
pub mod page;
pub mod types;

pub use model::{
    Order, OrderLine, OrderStatus, ParseStatusError, Payment, PaymentStatus, Product,
};
pub use money::Money;
pub use page::{Page, PageRequest};
pub use types::{OrderId, PaymentId, ProductId};
