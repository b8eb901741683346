//! Order workflow: placing, cancelling and fulfilling orders.

use chrono::Utc;
use common::{Money, Order, OrderId, OrderLine, OrderStatus, Page, PageRequest, PaymentStatus};
use store::{Store, UnitOfWork};

use crate::error::DomainError;
use crate::inventory::InventoryLedger;

use super::{CreateOrder, OrderError};

/// Service for managing orders.
///
/// Each mutating method runs in one unit of work. Any error returned before
/// the commit drops the unit of work, which discards every stock movement
/// made so far.
pub struct OrderWorkflow<S: Store> {
    store: S,
    ledger: InventoryLedger,
}

impl<S: Store> OrderWorkflow<S> {
    /// Creates a new order workflow over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ledger: InventoryLedger::new(),
        }
    }

    /// Reserves stock for every line and records a new pending order.
    ///
    /// Each line's unit price is captured at reservation time and the order
    /// total is fixed from those prices.
    #[tracing::instrument(skip(self), fields(lines = cmd.lines.len()))]
    pub async fn create(&self, cmd: CreateOrder) -> Result<Order, DomainError> {
        if cmd.lines.is_empty() {
            return Err(OrderError::NoLines.into());
        }
        if let Some(line) = cmd.lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
            }
            .into());
        }

        let mut uow = self.store.begin().await?;

        let mut lines = Vec::with_capacity(cmd.lines.len());
        let mut total = Money::zero();
        for request in &cmd.lines {
            let reservation = self
                .ledger
                .reserve(&mut uow, request.product_id, request.quantity)
                .await?;

            let line = OrderLine {
                product_id: reservation.product_id,
                product_name: reservation.product_name,
                quantity: request.quantity,
                unit_price: reservation.unit_price,
            };
            total = line
                .line_total()
                .and_then(|line_total| total.checked_add(line_total))
                .ok_or(OrderError::TotalOverflow)?;
            lines.push(line);
        }

        let order = Order {
            id: OrderId::new(),
            lines,
            total,
            status: OrderStatus::Pending,
            payment_id: None,
            created_at: Utc::now(),
        };
        let order = uow.save_order(order).await?;
        uow.commit().await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "order created");
        Ok(order)
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut uow = self.store.begin().await?;
        let order = uow.find_order(order_id).await?;
        uow.rollback().await?;
        order.ok_or_else(|| OrderError::NotFound(order_id).into())
    }

    /// Lists orders oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, request: PageRequest) -> Result<Page<Order>, DomainError> {
        let mut uow = self.store.begin().await?;
        let page = uow.list_orders(request).await?;
        uow.rollback().await?;
        Ok(page)
    }

    /// Cancels a pending order and returns its reserved stock.
    ///
    /// Delivered orders cannot be cancelled; their stock has left the shop.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .find_order_for_update(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        match order.status {
            OrderStatus::Cancelled => return Err(OrderError::AlreadyCancelled.into()),
            OrderStatus::Delivered => return Err(OrderError::AlreadyDelivered.into()),
            OrderStatus::Pending => {}
        }

        for line in &order.lines {
            self.ledger
                .release(&mut uow, line.product_id, line.quantity)
                .await?;
        }

        order.status = OrderStatus::Cancelled;
        let order = uow.save_order(order).await?;
        uow.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%order_id, "order cancelled");
        Ok(order)
    }

    /// Marks a paid, pending order as delivered.
    #[tracing::instrument(skip(self))]
    pub async fn fulfill(&self, order_id: OrderId) -> Result<Order, DomainError> {
        let mut uow = self.store.begin().await?;
        let mut order = uow
            .find_order_for_update(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        let paid = match order.payment_id {
            Some(payment_id) => uow
                .find_payment(payment_id)
                .await?
                .is_some_and(|payment| payment.status == PaymentStatus::Paid),
            None => false,
        };
        if !paid {
            return Err(OrderError::NotPaid.into());
        }

        match order.status {
            OrderStatus::Cancelled => return Err(OrderError::AlreadyCancelled.into()),
            OrderStatus::Delivered => return Err(OrderError::AlreadyDelivered.into()),
            OrderStatus::Pending => {}
        }

        order.status = OrderStatus::Delivered;
        let order = uow.save_order(order).await?;
        uow.commit().await?;

        metrics::counter!("orders_delivered_total").increment(1);
        tracing::info!(%order_id, "order delivered");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryError;
    use common::{Product, ProductId};
    use store::InMemoryStore;

    async fn seed(store: &InMemoryStore, name: &str, price_cents: i64, stock: i64) -> ProductId {
        let id = ProductId::new();
        let mut uow = store.begin().await.unwrap();
        uow.save_product(Product {
            id,
            name: name.to_string(),
            description: format!("{name} for tests"),
            price: Money::from_cents(price_cents),
            stock_quantity: stock,
        })
        .await
        .unwrap();
        uow.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_create_order_snapshots_prices() {
        let store = InMemoryStore::new();
        let keyboard = seed(&store, "Keyboard", 10000, 10).await;
        let mouse = seed(&store, "Mouse", 2550, 5).await;
        let workflow = OrderWorkflow::new(store.clone());

        let order = workflow
            .create(CreateOrder::default().line(keyboard, 3).line(mouse, 2))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total, Money::from_cents(35100));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].product_name, "Keyboard");
        assert_eq!(order.lines[1].unit_price, Money::from_cents(2550));
        assert!(order.payment_id.is_none());
        assert_eq!(store.product(keyboard).await.unwrap().stock_quantity, 7);
        assert_eq!(store.product(mouse).await.unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_order() {
        let workflow = OrderWorkflow::new(InMemoryStore::new());
        let err = workflow.create(CreateOrder::default()).await.unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::NoLines)));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_quantity() {
        let store = InMemoryStore::new();
        let keyboard = seed(&store, "Keyboard", 10000, 10).await;
        let workflow = OrderWorkflow::new(store.clone());

        let err = workflow
            .create(CreateOrder::default().line(keyboard, 0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::InvalidQuantity { .. })
        ));
        assert_eq!(store.product(keyboard).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_failed_line_rolls_back_earlier_reservations() {
        let store = InMemoryStore::new();
        let keyboard = seed(&store, "Keyboard", 10000, 10).await;
        let mouse = seed(&store, "Mouse", 2500, 1).await;
        let workflow = OrderWorkflow::new(store.clone());

        let err = workflow
            .create(CreateOrder::default().line(keyboard, 3).line(mouse, 2))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Inventory(InventoryError::InsufficientStock { .. })
        ));
        assert_eq!(store.product(keyboard).await.unwrap().stock_quantity, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_releases_stock() {
        let store = InMemoryStore::new();
        let keyboard = seed(&store, "Keyboard", 10000, 10).await;
        let workflow = OrderWorkflow::new(store.clone());
        let order = workflow
            .create(CreateOrder::default().line(keyboard, 4))
            .await
            .unwrap();

        let cancelled = workflow.cancel(order.id).await.unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(store.product(keyboard).await.unwrap().stock_quantity, 10);
    }

    #[tokio::test]
    async fn test_cancel_missing_order() {
        let workflow = OrderWorkflow::new(InMemoryStore::new());
        let err = workflow.cancel(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fulfill_requires_payment() {
        let store = InMemoryStore::new();
        let keyboard = seed(&store, "Keyboard", 10000, 10).await;
        let workflow = OrderWorkflow::new(store.clone());
        let order = workflow
            .create(CreateOrder::default().line(keyboard, 1))
            .await
            .unwrap();

        let err = workflow.fulfill(order.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::NotPaid)));
        assert_eq!(
            workflow.get(order.id).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let store = InMemoryStore::new();
        let keyboard = seed(&store, "Keyboard", 10000, 10).await;
        let workflow = OrderWorkflow::new(store.clone());
        let first = workflow
            .create(CreateOrder::default().line(keyboard, 1))
            .await
            .unwrap();
        workflow
            .create(CreateOrder::default().line(keyboard, 2))
            .await
            .unwrap();

        assert_eq!(workflow.get(first.id).await.unwrap(), first);

        let page = workflow.list(PageRequest::new(0, 1)).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 2);

        let err = workflow.get(OrderId::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::Order(OrderError::NotFound(_))));
    }
}
