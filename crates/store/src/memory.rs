use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Order, OrderId, Page, PageRequest, Payment, PaymentId, Product, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{StockReservation, Store, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory store implementation for testing and local runs.
///
/// A unit of work holds the store lock from `begin` until it is committed or
/// dropped, so units of work are fully serialized. Writes go to a working
/// copy that replaces the committed tables on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed state of a product.
    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.tables.lock().await.products.get(&id).cloned()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    /// Returns the number of committed payments.
    pub async fn payment_count(&self) -> usize {
        self.tables.lock().await.payments.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type UnitOfWork = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<InMemoryUnitOfWork> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnitOfWork { guard, working })
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>> {
        Ok(self
            .working
            .products
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list_products(&mut self, request: PageRequest) -> Result<Page<Product>> {
        let mut products: Vec<_> = self.working.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(request.slice(products))
    }

    async fn save_product(&mut self, product: Product) -> Result<Product> {
        let name_taken = self
            .working
            .products
            .values()
            .any(|p| p.name == product.name && p.id != product.id);
        if name_taken {
            return Err(StoreError::UniqueViolation {
                constraint: "unique_product_name".to_string(),
            });
        }
        self.working.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        Ok(self.working.products.remove(&id).is_some())
    }

    async fn reserve_stock(&mut self, id: ProductId, quantity: u32) -> Result<StockReservation> {
        let Some(product) = self.working.products.get_mut(&id) else {
            return Ok(StockReservation::Missing);
        };
        let requested = i64::from(quantity);
        if product.stock_quantity == 0 {
            return Ok(StockReservation::OutOfStock);
        }
        if product.stock_quantity < requested {
            return Ok(StockReservation::Insufficient {
                available: product.stock_quantity,
            });
        }
        product.stock_quantity -= requested;
        Ok(StockReservation::Reserved(product.clone()))
    }

    async fn release_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        Ok(self.working.products.get_mut(&id).map(|product| {
            product.stock_quantity += i64::from(quantity);
            product.clone()
        }))
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    // The whole store is already locked for this unit of work.
    async fn find_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.find_order(id).await
    }

    async fn list_orders(&mut self, request: PageRequest) -> Result<Page<Order>> {
        let mut orders: Vec<_> = self.working.orders.values().cloned().collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(request.slice(orders))
    }

    async fn save_order(&mut self, order: Order) -> Result<Order> {
        self.working.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.working.payments.get(&id).cloned())
    }

    async fn find_payment_for_update(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        self.find_payment(id).await
    }

    async fn list_payments(&mut self, request: PageRequest) -> Result<Page<Payment>> {
        let mut payments: Vec<_> = self.working.payments.values().cloned().collect();
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(request.slice(payments))
    }

    async fn save_payment(&mut self, payment: Payment) -> Result<Payment> {
        let order_has_other_payment = self
            .working
            .payments
            .values()
            .any(|p| p.order_id == payment.order_id && p.id != payment.id);
        if order_has_other_payment {
            return Err(StoreError::UniqueViolation {
                constraint: "unique_payment_per_order".to_string(),
            });
        }
        self.working.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Money, OrderStatus, PaymentStatus};

    fn product(name: &str, stock: i64) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: "A product used in tests".to_string(),
            price: Money::from_cents(10000),
            stock_quantity: stock,
        }
    }

    fn order() -> Order {
        Order {
            id: OrderId::new(),
            lines: vec![],
            total: Money::zero(),
            status: OrderStatus::Pending,
            payment_id: None,
            created_at: Utc::now(),
        }
    }

    fn payment(order_id: OrderId) -> Payment {
        let now = Utc::now();
        Payment {
            id: PaymentId::new(),
            order_id,
            amount: Money::from_cents(100),
            status: PaymentStatus::Pending,
            created_at: now,
            authorized_at: None,
            updated_at: now,
        }
    }

    async fn seed(store: &InMemoryStore, product: Product) {
        let mut uow = store.begin().await.unwrap();
        uow.save_product(product).await.unwrap();
        uow.commit().await.unwrap();
    }

    #[tokio::test]
    async fn commit_makes_writes_visible() {
        let store = InMemoryStore::new();
        let p = product("Keyboard", 10);
        seed(&store, p.clone()).await;

        assert_eq!(store.product(p.id).await, Some(p));
    }

    #[tokio::test]
    async fn dropping_unit_of_work_rolls_back() {
        let store = InMemoryStore::new();
        let p = product("Keyboard", 10);
        seed(&store, p.clone()).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.reserve_stock(p.id, 4).await.unwrap();
            uow.save_order(order()).await.unwrap();
        }

        assert_eq!(store.product(p.id).await.unwrap().stock_quantity, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn explicit_rollback_discards_writes() {
        let store = InMemoryStore::new();
        let p = product("Keyboard", 10);
        seed(&store, p.clone()).await;

        let mut uow = store.begin().await.unwrap();
        uow.release_stock(p.id, 5).await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(store.product(p.id).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn reads_see_own_writes() {
        let store = InMemoryStore::new();
        let p = product("Keyboard", 10);
        seed(&store, p.clone()).await;

        let mut uow = store.begin().await.unwrap();
        uow.reserve_stock(p.id, 3).await.unwrap();
        let seen = uow.find_product(p.id).await.unwrap().unwrap();
        assert_eq!(seen.stock_quantity, 7);
    }

    #[tokio::test]
    async fn reserve_stock_classifies_failures() {
        let store = InMemoryStore::new();
        let empty = product("Empty", 0);
        let few = product("Few", 2);
        seed(&store, empty.clone()).await;
        seed(&store, few.clone()).await;

        let mut uow = store.begin().await.unwrap();
        assert_eq!(
            uow.reserve_stock(ProductId::new(), 1).await.unwrap(),
            StockReservation::Missing
        );
        assert_eq!(
            uow.reserve_stock(empty.id, 1).await.unwrap(),
            StockReservation::OutOfStock
        );
        assert_eq!(
            uow.reserve_stock(few.id, 3).await.unwrap(),
            StockReservation::Insufficient { available: 2 }
        );
        match uow.reserve_stock(few.id, 2).await.unwrap() {
            StockReservation::Reserved(p) => assert_eq!(p.stock_quantity, 0),
            other => panic!("expected reservation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_stock_on_missing_product() {
        let store = InMemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        assert!(
            uow.release_stock(ProductId::new(), 1)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn product_names_are_unique() {
        let store = InMemoryStore::new();
        seed(&store, product("Keyboard", 1)).await;

        let mut uow = store.begin().await.unwrap();
        let result = uow.save_product(product("Keyboard", 5)).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn one_payment_per_order() {
        let store = InMemoryStore::new();
        let order_id = OrderId::new();

        let mut uow = store.begin().await.unwrap();
        uow.save_payment(payment(order_id)).await.unwrap();
        let result = uow.save_payment(payment(order_id)).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn listings_are_ordered_and_paged() {
        let store = InMemoryStore::new();
        seed(&store, product("Charlie", 1)).await;
        seed(&store, product("Alpha", 1)).await;
        seed(&store, product("Bravo", 1)).await;

        let mut uow = store.begin().await.unwrap();
        let page = uow.list_products(PageRequest::new(0, 2)).await.unwrap();
        let names: Vec<_> = page.content.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);

        let first = order();
        let mut second = order();
        second.created_at = first.created_at + chrono::Duration::seconds(1);
        uow.save_order(second.clone()).await.unwrap();
        uow.save_order(first.clone()).await.unwrap();
        let orders = uow.list_orders(PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(orders.content, vec![first, second]);
    }
}
