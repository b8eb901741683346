//! Per-product stock reservations.

use common::{Money, Product, ProductId};
use store::{StockReservation, UnitOfWork};
use thiserror::Error;

use crate::error::{DomainError, ErrorKind};

/// Errors raised while moving stock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product out of stock.")]
    OutOfStock { product_id: ProductId },

    #[error(
        "Product doesn't have sufficient stock to fulfill this order: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::ProductNotFound(_) => ErrorKind::NotFound,
            InventoryError::OutOfStock { .. } | InventoryError::InsufficientStock { .. } => {
                ErrorKind::Conflict
            }
        }
    }
}

/// Result of a successful reservation, carrying what an order line snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    /// Stock left after the reservation.
    pub remaining: i64,
}

/// Single source of truth for per-product stock.
///
/// The ledger holds no state of its own; it operates on the unit of work it
/// is handed, so its changes commit or roll back with the caller's.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    pub fn new() -> Self {
        Self
    }

    /// Atomically takes `quantity` units of a product out of stock.
    #[tracing::instrument(skip(self, uow))]
    pub async fn reserve<U: UnitOfWork>(
        &self,
        uow: &mut U,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Reservation, DomainError> {
        let rejected = |reason: &'static str| {
            metrics::counter!("stock_reservations_rejected_total", "reason" => reason)
                .increment(1);
            tracing::warn!(%product_id, quantity, reason, "stock reservation rejected");
        };

        match uow.reserve_stock(product_id, quantity).await? {
            StockReservation::Reserved(product) => Ok(Reservation {
                product_id,
                product_name: product.name,
                unit_price: product.price,
                remaining: product.stock_quantity,
            }),
            StockReservation::Missing => {
                rejected("not_found");
                Err(InventoryError::ProductNotFound(product_id).into())
            }
            StockReservation::OutOfStock => {
                rejected("out_of_stock");
                Err(InventoryError::OutOfStock { product_id }.into())
            }
            StockReservation::Insufficient { available } => {
                rejected("insufficient_stock");
                Err(InventoryError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                }
                .into())
            }
        }
    }

    /// Puts `quantity` previously reserved units back into stock.
    #[tracing::instrument(skip(self, uow))]
    pub async fn release<U: UnitOfWork>(
        &self,
        uow: &mut U,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Product, DomainError> {
        uow.release_stock(product_id, quantity)
            .await?
            .ok_or_else(|| InventoryError::ProductNotFound(product_id).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryStore, Store};

    async fn seeded(stock: i64) -> (InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let id = ProductId::new();
        let mut uow = store.begin().await.unwrap();
        uow.save_product(Product {
            id,
            name: "Keyboard".to_string(),
            description: "Mechanical keyboard".to_string(),
            price: Money::from_cents(10000),
            stock_quantity: stock,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn test_reserve_returns_price_snapshot() {
        let (store, id) = seeded(10).await;
        let ledger = InventoryLedger::new();

        let mut uow = store.begin().await.unwrap();
        let reservation = ledger.reserve(&mut uow, id, 3).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(reservation.unit_price, Money::from_cents(10000));
        assert_eq!(reservation.product_name, "Keyboard");
        assert_eq!(reservation.remaining, 7);
        assert_eq!(store.product(id).await.unwrap().stock_quantity, 7);
    }

    #[tokio::test]
    async fn test_reserve_missing_product() {
        let (store, _) = seeded(10).await;
        let ledger = InventoryLedger::new();
        let missing = ProductId::new();

        let mut uow = store.begin().await.unwrap();
        let err = ledger.reserve(&mut uow, missing, 1).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Inventory(InventoryError::ProductNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_reserve_from_empty_stock_is_out_of_stock() {
        let (store, id) = seeded(0).await;
        let ledger = InventoryLedger::new();

        let mut uow = store.begin().await.unwrap();
        let err = ledger.reserve(&mut uow, id, 1).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Inventory(InventoryError::OutOfStock { .. })
        ));
    }

    #[tokio::test]
    async fn test_reserve_more_than_available() {
        let (store, id) = seeded(2).await;
        let ledger = InventoryLedger::new();

        let mut uow = store.begin().await.unwrap();
        let err = ledger.reserve(&mut uow, id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Inventory(InventoryError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
        assert_eq!(uow.find_product(id).await.unwrap().unwrap().stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_reserve_then_release_restores_stock() {
        let (store, id) = seeded(10).await;
        let ledger = InventoryLedger::new();

        let mut uow = store.begin().await.unwrap();
        ledger.reserve(&mut uow, id, 4).await.unwrap();
        ledger.reserve(&mut uow, id, 6).await.unwrap();
        ledger.release(&mut uow, id, 6).await.unwrap();
        let product = ledger.release(&mut uow, id, 4).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(product.stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_release_missing_product() {
        let (store, _) = seeded(1).await;
        let ledger = InventoryLedger::new();

        let mut uow = store.begin().await.unwrap();
        let err = ledger
            .release(&mut uow, ProductId::new(), 1)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
