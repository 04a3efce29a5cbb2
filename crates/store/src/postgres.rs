use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, ProductId, UserId};
use domain::{
    NewProduct, Order, OrderRecord, OrderStatus, OrderStore, PaymentStatus, Product,
    ProductRecord, ProductStore, StatusPair, StockOperation, StoreError,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};

const ORDER_COLUMNS: &str = "id, user_id, product_id, product_name, unit_price, quantity, \
     total_price, order_status, payment_status, created_at";

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price, total_qty, reserved_qty, \
     is_active, created_at, updated_at";

/// Runs the database migrations for both tables.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        tracing::error!(operation, error = %err, "database operation failed");
        StoreError::Internal(err.to_string())
    }
}

/// Maps the outcome of a conditional stock `UPDATE` onto the store contract.
fn stock_outcome(
    rows_affected: u64,
    product_id: ProductId,
    operation: StockOperation,
    qty: i32,
) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(operation.no_match(product_id, qty));
    }
    Ok(())
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_order(row: PgRow) -> Result<Order, sqlx::Error> {
        let order_status: String = row.try_get("order_status")?;
        let payment_status: String = row.try_get("payment_status")?;

        Ok(Order::from(OrderRecord {
            id: OrderId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("product_name")?,
            unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
            quantity: row.try_get("quantity")?,
            total_price: Money::new(row.try_get::<Decimal, _>("total_price")?),
            order_status: order_status
                .parse::<OrderStatus>()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            payment_status: payment_status
                .parse::<PaymentStatus>()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (user_id, product_id, product_name, unit_price, quantity,
                                total_price, order_status, payment_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, created_at
            "#,
        )
        .bind(order.user_id().as_i64())
        .bind(order.product_id().as_i64())
        .bind(order.product_name())
        .bind(order.unit_price().amount())
        .bind(order.quantity())
        .bind(order.total_price().amount())
        .bind(order.order_status().as_str())
        .bind(order.payment_status().as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("insert order"))?;

        let id: i64 = row.try_get("id").map_err(db_error("insert order"))?;
        let created_at = row.try_get("created_at").map_err(db_error("insert order"))?;
        Ok(order.with_identity(OrderId::new(id), created_at))
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order, StoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("select order"))?
            .ok_or_else(|| StoreError::order_not_found(id))?;

        Self::row_to_order(row).map_err(db_error("decode order"))
    }

    async fn get_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("select orders"))?;

        rows.into_iter()
            .map(Self::row_to_order)
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_error("decode order"))
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: StatusPair,
        next: StatusPair,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET order_status = $1, payment_status = $2
            WHERE id = $3 AND order_status = $4 AND payment_status = $5
            "#,
        )
        .bind(next.order_status.as_str())
        .bind(next.payment_status.as_str())
        .bind(id.as_i64())
        .bind(expected.order_status.as_str())
        .bind(expected.payment_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("update order status"))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing matched: either the row is gone or another writer moved it.
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("update order status"))?;
        if exists {
            Err(StoreError::StatusConflict { id })
        } else {
            Err(StoreError::order_not_found(id))
        }
    }
}

/// PostgreSQL-backed product store.
///
/// Stock operations are single conditional `UPDATE` statements; the database
/// serializes concurrent callers on the row lock, so no read-modify-write
/// happens in process.
#[derive(Clone)]
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    /// Creates a new PostgreSQL product store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: PgRow) -> Result<Product, StoreError> {
        let decode = db_error("decode product");
        let record = (|| -> Result<ProductRecord, sqlx::Error> {
            Ok(ProductRecord {
                id: ProductId::new(row.try_get("id")?),
                sku: row.try_get("sku")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                price: Money::new(row.try_get::<Decimal, _>("price")?),
                total_qty: row.try_get("total_qty")?,
                reserved_qty: row.try_get("reserved_qty")?,
                is_active: row.try_get("is_active")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            })
        })()
        .map_err(decode)?;

        Product::try_from(record).map_err(|e| {
            tracing::error!(error = %e, "stored product breaks stock invariant");
            StoreError::Internal(e.to_string())
        })
    }

    async fn update_stock(
        &self,
        sql: &'static str,
        id: ProductId,
        qty: i32,
        operation: StockOperation,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(sql)
            .bind(qty)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(db_error(operation.as_str()))?;

        stock_outcome(result.rows_affected(), id, operation, qty)
    }
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (sku, name, description, price, total_qty, reserved_qty,
                                  is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.total_qty)
        .bind(product.is_active)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("insert product"))?;

        Self::row_to_product(row)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Product, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("select product"))?
            .ok_or_else(|| StoreError::product_not_found(id))?;

        Self::row_to_product(row)
    }

    async fn get_all(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("select products"))?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn reserve_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        self.update_stock(
            r#"
            UPDATE products
            SET reserved_qty = reserved_qty + $1, updated_at = NOW()
            WHERE id = $2 AND total_qty - reserved_qty >= $1
            "#,
            id,
            qty,
            StockOperation::Reserve,
        )
        .await
    }

    async fn release_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        self.update_stock(
            r#"
            UPDATE products
            SET reserved_qty = reserved_qty - $1, updated_at = NOW()
            WHERE id = $2 AND reserved_qty >= $1
            "#,
            id,
            qty,
            StockOperation::Release,
        )
        .await
    }

    async fn confirm_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        self.update_stock(
            r#"
            UPDATE products
            SET total_qty = total_qty - $1, reserved_qty = reserved_qty - $1, updated_at = NOW()
            WHERE id = $2 AND reserved_qty >= $1
            "#,
            id,
            qty,
            StockOperation::Confirm,
        )
        .await
    }
}
