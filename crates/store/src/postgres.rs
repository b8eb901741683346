use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    Money, Order, OrderId, OrderLine, OrderStatus, Page, PageRequest, Payment, PaymentId,
    PaymentStatus, Product, ProductId,
};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{StockReservation, Store, UnitOfWork},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::debug!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    type UnitOfWork = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// Unit of work backed by a PostgreSQL transaction.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::UniqueViolation {
            constraint: db_err.constraint().unwrap_or("unknown").to_string(),
        };
    }
    StoreError::Database(e)
}

fn limit_offset(request: PageRequest) -> (i64, i64) {
    (
        i64::from(request.size),
        i64::try_from(request.offset()).unwrap_or(i64::MAX),
    )
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        stock_quantity: row.try_get("stock_quantity")?,
    })
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    let quantity: i64 = row.try_get("quantity")?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("order line quantity out of range: {quantity}")))?;

    Ok(OrderLine {
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity,
        unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
    })
}

fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
    let status: String = row.try_get("status")?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        lines,
        total: Money::from_cents(row.try_get("total_cents")?),
        status: status
            .parse::<OrderStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        payment_id: row
            .try_get::<Option<Uuid>, _>("payment_id")?
            .map(PaymentId::from_uuid),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_payment(row: &PgRow) -> Result<Payment> {
    let status: String = row.try_get("status")?;

    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        amount: Money::from_cents(row.try_get("amount_cents")?),
        status: status
            .parse::<PaymentStatus>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: row.try_get("created_at")?,
        authorized_at: row.try_get("authorized_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl PgUnitOfWork {
    async fn lines_for(&mut self, order_ids: Vec<Uuid>) -> Result<HashMap<Uuid, Vec<OrderLine>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines.entry(order_id).or_default().push(row_to_line(row)?);
        }
        Ok(lines)
    }

    async fn load_order(&mut self, id: OrderId, lock: bool) -> Result<Option<Order>> {
        let sql = if lock {
            "SELECT id, total_cents, status, payment_id, created_at FROM orders WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, total_cents, status, payment_id, created_at FROM orders WHERE id = $1"
        };
        let row = sqlx::query(sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut lines = self.lines_for(vec![id.as_uuid()]).await?;
        let order_lines = lines.remove(&id.as_uuid()).unwrap_or_default();
        row_to_order(&row, order_lines).map(Some)
    }

    async fn load_payment(&mut self, id: PaymentId, lock: bool) -> Result<Option<Payment>> {
        let sql = if lock {
            r#"
            SELECT id, order_id, amount_cents, status, created_at, authorized_at, updated_at
            FROM payments
            WHERE id = $1
            FOR UPDATE
            "#
        } else {
            r#"
            SELECT id, order_id, amount_cents, status, created_at, authorized_at, updated_at
            FROM payments
            WHERE id = $1
            "#
        };
        let row = sqlx::query(sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_payment).transpose()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, description, price_cents, stock_quantity FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_product_by_name(&mut self, name: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, description, price_cents, stock_quantity FROM products WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn list_products(&mut self, request: PageRequest) -> Result<Page<Product>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.tx)
            .await?;

        let (limit, offset) = limit_offset(request);
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price_cents, stock_quantity
            FROM products
            ORDER BY name ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        let content = rows.iter().map(row_to_product).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(content, request, total as u64))
    }

    async fn save_product(&mut self, product: Product) -> Result<Product> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock_quantity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                price_cents = EXCLUDED.price_cents,
                stock_quantity = EXCLUDED.stock_quantity
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock_quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(product)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reserve_stock(&mut self, id: ProductId, quantity: u32) -> Result<StockReservation> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $2
            WHERE id = $1 AND stock_quantity > 0 AND stock_quantity >= $2
            RETURNING id, name, description, price_cents, stock_quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = row {
            return Ok(StockReservation::Reserved(row_to_product(&row)?));
        }

        // Nothing was decremented; read the counter only to say why. Another
        // unit of work may commit in between, so the reason is advisory.
        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(match available {
            None => StockReservation::Missing,
            Some(0) => StockReservation::OutOfStock,
            Some(available) => StockReservation::Insufficient { available },
        })
    }

    async fn release_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2
            WHERE id = $1
            RETURNING id, name, description, price_cents, stock_quantity
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.load_order(id, false).await
    }

    async fn find_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.load_order(id, true).await
    }

    async fn list_orders(&mut self, request: PageRequest) -> Result<Page<Order>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&mut *self.tx)
            .await?;

        let (limit, offset) = limit_offset(request);
        let rows = sqlx::query(
            r#"
            SELECT id, total_cents, status, payment_id, created_at
            FROM orders
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut lines = self.lines_for(ids).await?;

        let content = rows
            .iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                row_to_order(row, lines.remove(&id).unwrap_or_default())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(content, request, total as u64))
    }

    async fn save_order(&mut self, order: Order) -> Result<Order> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, total_cents, status, payment_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                total_cents = EXCLUDED.total_cents,
                status = EXCLUDED.status,
                payment_id = EXCLUDED.payment_id
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(order.payment_id.map(|id| id.as_uuid()))
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(order.id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, position, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_uuid())
            .bind(&line.product_name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        }

        Ok(order)
    }

    async fn find_payment(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        self.load_payment(id, false).await
    }

    async fn find_payment_for_update(&mut self, id: PaymentId) -> Result<Option<Payment>> {
        self.load_payment(id, true).await
    }

    async fn list_payments(&mut self, request: PageRequest) -> Result<Page<Payment>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(&mut *self.tx)
            .await?;

        let (limit, offset) = limit_offset(request);
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, amount_cents, status, created_at, authorized_at, updated_at
            FROM payments
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        let content = rows.iter().map(row_to_payment).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(content, request, total as u64))
    }

    async fn save_payment(&mut self, payment: Payment) -> Result<Payment> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, status, created_at, authorized_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                amount_cents = EXCLUDED.amount_cents,
                status = EXCLUDED.status,
                authorized_at = EXCLUDED.authorized_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(payment.amount.cents())
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .bind(payment.authorized_at)
        .bind(payment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(payment)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
