//! Inventory use case: product catalogue and stock operations.

use std::future::Future;
use std::time::Duration;

use common::ProductId;

use crate::error::{DomainError, StoreError};
use crate::store::{ProductStore, StockOperation};

use super::{NewProduct, Product, ProductError};

/// Service for managing products and their stock.
///
/// Every store call is bounded by the service timeout. Stock mutations are
/// delegated to the store's atomic conditional updates; the service only
/// validates input and records outcomes.
pub struct ProductService<S: ProductStore> {
    store: S,
    timeout: Duration,
}

impl<S: ProductStore> ProductService<S> {
    /// Creates a new product service over the given store.
    pub fn new(store: S, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a product after validating quantities and price.
    #[tracing::instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        product.validate()?;
        let created = self.bounded(self.store.create(product)).await?;
        tracing::info!(product_id = %created.id(), "product created");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.bounded(self.store.get_by_id(id)).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_all_products(&self) -> Result<Vec<Product>, DomainError> {
        self.bounded(self.store.get_all()).await
    }

    /// Reserves stock for an in-flight order.
    #[tracing::instrument(skip(self))]
    pub async fn reserve_stock(&self, id: ProductId, qty: i32) -> Result<(), DomainError> {
        self.stock_operation(StockOperation::Reserve, qty, self.store.reserve_stock(id, qty))
            .await
    }

    /// Returns previously reserved stock.
    #[tracing::instrument(skip(self))]
    pub async fn release_stock(&self, id: ProductId, qty: i32) -> Result<(), DomainError> {
        self.stock_operation(StockOperation::Release, qty, self.store.release_stock(id, qty))
            .await
    }

    /// Permanently deducts previously reserved stock.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_stock(&self, id: ProductId, qty: i32) -> Result<(), DomainError> {
        self.stock_operation(StockOperation::Confirm, qty, self.store.confirm_stock(id, qty))
            .await
    }

    async fn stock_operation(
        &self,
        operation: StockOperation,
        qty: i32,
        fut: impl Future<Output = Result<(), StoreError>>,
    ) -> Result<(), DomainError> {
        if qty <= 0 {
            return Err(ProductError::InvalidQuantity { quantity: qty }.into());
        }

        let result = self.bounded(fut).await;
        let outcome = match &result {
            Ok(()) => "ok",
            Err(DomainError::Store(StoreError::InsufficientStock { .. })) => "insufficient_stock",
            Err(DomainError::Store(StoreError::InvariantViolation { .. })) => {
                tracing::error!(%operation, qty, "stock invariant violated");
                "invariant_violation"
            }
            Err(_) => "error",
        };
        metrics::counter!(
            "stock_operations_total",
            "operation" => operation.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        result
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, DomainError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(DomainError::from),
            Err(_) => Err(DomainError::Timeout(self.timeout)),
        }
    }
}
