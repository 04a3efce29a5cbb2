//! Inventory client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use domain::ProductView;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SagaError;

/// Body of the inventory stock endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Client for the inventory service, as seen from the order service.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Fetches the product snapshot used to price an order.
    async fn get_product(&self, id: ProductId) -> Result<ProductView, SagaError>;

    /// Reserves stock. Fails with [`SagaError::InsufficientStock`] when not
    /// enough is available.
    async fn reserve_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError>;

    /// Returns reserved stock.
    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError>;

    /// Permanently deducts reserved stock.
    async fn confirm_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError>;
}

#[async_trait]
impl<T: InventoryClient + ?Sized> InventoryClient for Arc<T> {
    async fn get_product(&self, id: ProductId) -> Result<ProductView, SagaError> {
        (**self).get_product(id).await
    }

    async fn reserve_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        (**self).reserve_stock(id, quantity).await
    }

    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        (**self).release_stock(id, quantity).await
    }

    async fn confirm_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        (**self).confirm_stock(id, quantity).await
    }
}

/// A call recorded by [`InMemoryInventoryClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryCall {
    GetProduct(ProductId),
    Reserve(StockRequest),
    Release(StockRequest),
    Confirm(StockRequest),
}

#[derive(Debug, Clone)]
struct StockEntry {
    view: ProductView,
    total: i32,
    reserved: i32,
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    products: HashMap<ProductId, StockEntry>,
    calls: Vec<InventoryCall>,
    fail_on_get_product: bool,
    fail_on_reserve: bool,
    fail_on_release: bool,
    fail_on_confirm: bool,
    reserve_delay: Option<Duration>,
    release_delay: Option<Duration>,
}

/// In-memory inventory client for testing.
///
/// Keeps a small stock table with the same reserve/release/confirm rules as
/// the inventory service, records every call, and can be told to fail or
/// stall individual operations.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryClient {
    state: Arc<Mutex<InMemoryInventoryState>>,
}

impl InMemoryInventoryClient {
    /// Creates a new in-memory inventory client with no products.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product with `total` units of stock.
    pub async fn add_product(&self, view: ProductView, total: i32) {
        self.state.lock().await.products.insert(
            view.id,
            StockEntry {
                view,
                total,
                reserved: 0,
            },
        );
    }

    pub async fn set_fail_on_get_product(&self, fail: bool) {
        self.state.lock().await.fail_on_get_product = fail;
    }

    /// Configures reserve calls to fail with a transport error.
    pub async fn set_fail_on_reserve(&self, fail: bool) {
        self.state.lock().await.fail_on_reserve = fail;
    }

    /// Configures release calls to fail with a transport error.
    pub async fn set_fail_on_release(&self, fail: bool) {
        self.state.lock().await.fail_on_release = fail;
    }

    pub async fn set_fail_on_confirm(&self, fail: bool) {
        self.state.lock().await.fail_on_confirm = fail;
    }

    /// Delays every reserve call before it takes effect.
    pub async fn set_reserve_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.reserve_delay = delay;
    }

    /// Delays every release call before it takes effect.
    pub async fn set_release_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.release_delay = delay;
    }

    /// Returns every call made so far, in order.
    pub async fn calls(&self) -> Vec<InventoryCall> {
        self.state.lock().await.calls.clone()
    }

    /// Returns the recorded release calls.
    pub async fn release_calls(&self) -> Vec<StockRequest> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                InventoryCall::Release(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    /// Returns the recorded reserve calls.
    pub async fn reserve_calls(&self) -> Vec<StockRequest> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                InventoryCall::Reserve(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    /// Returns `(total, reserved)` for a product.
    pub async fn stock(&self, id: ProductId) -> Option<(i32, i32)> {
        self.state
            .lock()
            .await
            .products
            .get(&id)
            .map(|entry| (entry.total, entry.reserved))
    }

    async fn record(&self, call: InventoryCall) -> (bool, Option<Duration>) {
        let mut state = self.state.lock().await;
        state.calls.push(call);
        match call {
            InventoryCall::GetProduct(_) => (state.fail_on_get_product, None),
            InventoryCall::Reserve(_) => (state.fail_on_reserve, state.reserve_delay),
            InventoryCall::Release(_) => (state.fail_on_release, state.release_delay),
            InventoryCall::Confirm(_) => (state.fail_on_confirm, None),
        }
    }

    /// Records the call, applies injected delay and failure, then runs the
    /// stock change under the lock.
    async fn stock_call(
        &self,
        call: fn(StockRequest) -> InventoryCall,
        request: StockRequest,
        apply: impl FnOnce(&mut StockEntry) -> Result<(), SagaError>,
    ) -> Result<(), SagaError> {
        let (fail, delay) = self.record(call(request)).await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(SagaError::InventoryService(
                "inventory service unavailable".to_string(),
            ));
        }

        let mut state = self.state.lock().await;
        match state.products.get_mut(&request.product_id) {
            Some(entry) => apply(entry),
            None => Err(SagaError::ProductNotFound(request.product_id)),
        }
    }
}

#[async_trait]
impl InventoryClient for InMemoryInventoryClient {
    async fn get_product(&self, id: ProductId) -> Result<ProductView, SagaError> {
        let (fail, _) = self.record(InventoryCall::GetProduct(id)).await;
        if fail {
            return Err(SagaError::InventoryService(
                "inventory service unavailable".to_string(),
            ));
        }

        self.state
            .lock()
            .await
            .products
            .get(&id)
            .map(|entry| entry.view.clone())
            .ok_or(SagaError::ProductNotFound(id))
    }

    async fn reserve_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        let request = StockRequest {
            product_id: id,
            quantity,
        };
        self.stock_call(InventoryCall::Reserve, request, |entry| {
            if entry.total - entry.reserved < quantity {
                return Err(SagaError::InsufficientStock {
                    product_id: id,
                    requested: quantity,
                });
            }
            entry.reserved += quantity;
            Ok(())
        })
        .await
    }

    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        let request = StockRequest {
            product_id: id,
            quantity,
        };
        self.stock_call(InventoryCall::Release, request, |entry| {
            if entry.reserved < quantity {
                return Err(SagaError::InventoryService(format!(
                    "cannot release {quantity} units, only {} reserved",
                    entry.reserved
                )));
            }
            entry.reserved -= quantity;
            Ok(())
        })
        .await
    }

    async fn confirm_stock(&self, id: ProductId, quantity: i32) -> Result<(), SagaError> {
        let request = StockRequest {
            product_id: id,
            quantity,
        };
        self.stock_call(InventoryCall::Confirm, request, |entry| {
            if entry.reserved < quantity {
                return Err(SagaError::InventoryService(format!(
                    "cannot confirm {quantity} units, only {} reserved",
                    entry.reserved
                )));
            }
            entry.reserved -= quantity;
            entry.total -= quantity;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;

    async fn client_with_stock(total: i32) -> InMemoryInventoryClient {
        let client = InMemoryInventoryClient::new();
        client
            .add_product(
                ProductView {
                    id: ProductId::new(1),
                    name: "Widget".to_string(),
                    price: Money::from_f64(10.0),
                },
                total,
            )
            .await;
        client
    }

    #[tokio::test]
    async fn test_reserve_release_confirm() {
        let client = client_with_stock(5).await;
        let id = ProductId::new(1);

        client.reserve_stock(id, 3).await.unwrap();
        client.release_stock(id, 1).await.unwrap();
        client.confirm_stock(id, 2).await.unwrap();

        assert_eq!(client.stock(id).await, Some((3, 0)));
        assert_eq!(client.calls().await.len(), 3);
        assert_eq!(
            client.release_calls().await,
            vec![StockRequest {
                product_id: id,
                quantity: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_insufficient_stock() {
        let client = client_with_stock(1).await;
        let result = client.reserve_stock(ProductId::new(1), 2).await;
        assert_eq!(
            result,
            Err(SagaError::InsufficientStock {
                product_id: ProductId::new(1),
                requested: 2
            })
        );
        assert_eq!(client.stock(ProductId::new(1)).await, Some((1, 0)));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let client = InMemoryInventoryClient::new();
        assert_eq!(
            client.get_product(ProductId::new(9)).await,
            Err(SagaError::ProductNotFound(ProductId::new(9)))
        );
    }

    #[tokio::test]
    async fn test_fail_on_release_is_recorded() {
        let client = client_with_stock(2).await;
        let id = ProductId::new(1);
        client.reserve_stock(id, 1).await.unwrap();
        client.set_fail_on_release(true).await;

        assert!(matches!(
            client.release_stock(id, 1).await,
            Err(SagaError::InventoryService(_))
        ));
        assert_eq!(client.release_calls().await.len(), 1);
        assert_eq!(client.stock(id).await, Some((2, 1)));
    }
}
