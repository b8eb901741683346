//! Persistence gateway for the shop.
//!
//! Every read and write goes through a [`UnitOfWork`] opened with
//! [`Store::begin`]. Writes become visible only on commit; dropping a unit of
//! work discards them.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PgUnitOfWork, PostgresStore};
pub use store::{StockReservation, Store, UnitOfWork};
