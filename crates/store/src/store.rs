use async_trait::async_trait;
use common::{Order, OrderId, Page, PageRequest, Payment, PaymentId, Product, ProductId};

use crate::Result;

/// Outcome of an atomic conditional stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockReservation {
    /// Stock was decremented; carries the product as it is after the decrement.
    Reserved(Product),
    /// No product with that id exists.
    Missing,
    /// The product has no stock at all.
    OutOfStock,
    /// The product has some stock, but less than requested.
    Insufficient { available: i64 },
}

/// One atomic unit of work against the store.
///
/// All reads observe the writes made earlier in the same unit of work.
/// Nothing is visible to other units of work until [`UnitOfWork::commit`]
/// succeeds. Dropping a unit of work without committing rolls it back.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    async fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>>;

    /// Lists products ordered by name.
    async fn list_products(&mut self, request: PageRequest) -> Result<Page<Product>>;

    /// Inserts or replaces a product by id.
    async fn save_product(&mut self, product: Product) -> Result<Product>;

    /// Deletes a product. Returns false if it did not exist.
    async fn delete_product(&mut self, id: ProductId) -> Result<bool>;

    /// Decrements stock by `quantity` only if at least that much is available.
    ///
    /// The check and the decrement are a single atomic step; implementations
    /// must never read the counter and write it back unconditionally.
    async fn reserve_stock(&mut self, id: ProductId, quantity: u32) -> Result<StockReservation>;

    /// Increments stock by `quantity`. Returns `None` if the product is gone.
    async fn release_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<Product>>;

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Loads an order and locks it until this unit of work ends.
    ///
    /// A concurrent unit of work locking the same order waits here and then
    /// observes the committed result, so status checks made on the returned
    /// order hold until commit.
    async fn find_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders oldest first.
    async fn list_orders(&mut self, request: PageRequest) -> Result<Page<Order>>;

    /// Inserts or replaces an order (and its lines) by id.
    async fn save_order(&mut self, order: Order) -> Result<Order>;

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>>;

    /// Loads a payment and locks it until this unit of work ends.
    async fn find_payment_for_update(&mut self, id: PaymentId) -> Result<Option<Payment>>;

    /// Lists payments oldest first.
    async fn list_payments(&mut self, request: PageRequest) -> Result<Page<Payment>>;

    /// Inserts or replaces a payment by id.
    async fn save_payment(&mut self, payment: Payment) -> Result<Payment>;

    /// Makes every write of this unit of work visible atomically.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this unit of work.
    async fn rollback(self) -> Result<()>;
}

/// Factory for units of work.
#[async_trait]
pub trait Store: Send + Sync {
    type UnitOfWork: UnitOfWork;

    /// Opens a new unit of work.
    async fn begin(&self) -> Result<Self::UnitOfWork>;
}
