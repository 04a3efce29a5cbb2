use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId};
use domain::{
    NewProduct, Order, OrderRecord, OrderStore, Product, ProductError, ProductStore, StatusPair,
    StockOperation, StoreError,
};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
struct OrderTable {
    rows: BTreeMap<OrderId, Order>,
    last_id: i64,
}

/// In-memory order store.
///
/// Identities are assigned sequentially starting at 1, like a database
/// sequence. Failure injection lets tests exercise the saga's compensation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    table: Arc<RwLock<OrderTable>>,
    fail_on_create: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent `create` call to fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.fail_on_create.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        if self.fail_on_create.load(Ordering::SeqCst) {
            return Err(StoreError::Internal("order insert rejected".to_string()));
        }

        let mut table = self.table.write().await;
        table.last_id += 1;
        let id = OrderId::new(table.last_id);
        let order = order.with_identity(id, Utc::now());
        table.rows.insert(id, order.clone());
        Ok(order)
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order, StoreError> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::order_not_found(id))
    }

    async fn get_all(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: StatusPair,
        next: StatusPair,
    ) -> Result<(), StoreError> {
        let mut table = self.table.write().await;
        let row = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| StoreError::order_not_found(id))?;
        if row.statuses() != expected {
            return Err(StoreError::StatusConflict { id });
        }

        *row = Order::from(OrderRecord {
            id,
            user_id: row.user_id(),
            product_id: row.product_id(),
            product_name: row.product_name().to_string(),
            unit_price: row.unit_price(),
            quantity: row.quantity(),
            total_price: row.total_price(),
            order_status: next.order_status,
            payment_status: next.payment_status,
            created_at: row.created_at(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ProductTable {
    rows: BTreeMap<ProductId, Product>,
    last_id: i64,
}

/// In-memory product store.
///
/// Each stock operation runs its check and update under one lock, which gives
/// the same all-or-nothing semantics as the conditional `UPDATE` in the
/// PostgreSQL store. A missing product behaves like a zero-row update.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductStore {
    table: Arc<Mutex<ProductTable>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a checked stock transition to one product.
    async fn apply(
        &self,
        id: ProductId,
        qty: i32,
        operation: StockOperation,
        transition: impl FnOnce(&mut Product) -> Result<(), ProductError>,
    ) -> Result<(), StoreError> {
        let mut table = self.table.lock().await;
        let applied = match table.rows.get_mut(&id) {
            Some(product) => transition(product).is_ok(),
            None => false,
        };
        if applied {
            Ok(())
        } else {
            Err(operation.no_match(id, qty))
        }
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut table = self.table.lock().await;
        let id = ProductId::new(table.last_id + 1);
        let product = Product::create(id, product, Utc::now())
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        table.last_id = id.as_i64();
        table.rows.insert(id, product.clone());
        Ok(product)
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Product, StoreError> {
        self.table
            .lock()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::product_not_found(id))
    }

    async fn get_all(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.table.lock().await.rows.values().cloned().collect())
    }

    async fn reserve_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        self.apply(id, qty, StockOperation::Reserve, |p| p.reserve(qty)).await
    }

    async fn release_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        self.apply(id, qty, StockOperation::Release, |p| p.release(qty)).await
    }

    async fn confirm_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        self.apply(id, qty, StockOperation::Confirm, |p| p.confirm(qty)).await
    }
}
