//! Persistence contracts for orders and products.
//!
//! Both services own their data exclusively. Stock changes are expressed as
//! single conditional updates so that concurrent callers are serialized by the
//! store rather than by in-process locks held across calls.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId};

use crate::error::StoreError;
use crate::order::{Order, StatusPair};
use crate::product::{NewProduct, Product};

/// The three conditional stock updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockOperation {
    Reserve,
    Release,
    Confirm,
}

impl StockOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOperation::Reserve => "reserve",
            StockOperation::Release => "release",
            StockOperation::Confirm => "confirm",
        }
    }

    /// Maps an update that matched no row onto the store contract.
    ///
    /// A reservation that finds no row has too little stock; a release or
    /// confirm that finds none means reserved stock has drifted.
    pub fn no_match(self, product_id: ProductId, quantity: i32) -> StoreError {
        match self {
            StockOperation::Reserve => StoreError::InsufficientStock {
                product_id,
                requested: quantity,
            },
            StockOperation::Release | StockOperation::Confirm => StoreError::InvariantViolation {
                product_id,
                operation: self,
                quantity,
            },
        }
    }
}

impl fmt::Display for StockOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store for the order ledger.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order, returning it with its assigned id and creation time.
    async fn create(&self, order: Order) -> Result<Order, StoreError>;

    /// Loads an order by id.
    async fn get_by_id(&self, id: OrderId) -> Result<Order, StoreError>;

    /// Loads all orders, ordered by id.
    async fn get_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Moves an order from `expected` to `next` if it is still in `expected`.
    ///
    /// This compare-and-set is the only serialization point for lifecycle
    /// changes: of several callers that loaded the same statuses, one wins
    /// and the rest get [`StoreError::StatusConflict`]. A missing order is
    /// [`StoreError::NotFound`].
    async fn update_status(
        &self,
        id: OrderId,
        expected: StatusPair,
        next: StatusPair,
    ) -> Result<(), StoreError>;
}

/// Store for the product inventory.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Persists a validated product with zero reserved stock.
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;

    async fn get_by_id(&self, id: ProductId) -> Result<Product, StoreError>;

    /// Loads all products, ordered by id.
    async fn get_all(&self) -> Result<Vec<Product>, StoreError>;

    /// Atomically increments reserved stock if `total - reserved >= qty`.
    ///
    /// No matching row yields [`StoreError::InsufficientStock`].
    async fn reserve_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError>;

    /// Atomically decrements reserved stock if `reserved >= qty`.
    ///
    /// No matching row yields [`StoreError::InvariantViolation`].
    async fn release_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError>;

    /// Atomically deducts `qty` from both total and reserved stock if
    /// `reserved >= qty`.
    ///
    /// No matching row yields [`StoreError::InvariantViolation`].
    async fn confirm_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        (**self).create(order).await
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order, StoreError> {
        (**self).get_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<Order>, StoreError> {
        (**self).get_all().await
    }

    async fn update_status(
        &self,
        id: OrderId,
        expected: StatusPair,
        next: StatusPair,
    ) -> Result<(), StoreError> {
        (**self).update_status(id, expected, next).await
    }
}

#[async_trait]
impl<T: ProductStore + ?Sized> ProductStore for Arc<T> {
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        (**self).create(product).await
    }

    async fn get_by_id(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).get_by_id(id).await
    }

    async fn get_all(&self) -> Result<Vec<Product>, StoreError> {
        (**self).get_all().await
    }

    async fn reserve_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        (**self).reserve_stock(id, qty).await
    }

    async fn release_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        (**self).release_stock(id, qty).await
    }

    async fn confirm_stock(&self, id: ProductId, qty: i32) -> Result<(), StoreError> {
        (**self).confirm_stock(id, qty).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_classification() {
        let id = ProductId::new(3);
        assert_eq!(
            StockOperation::Reserve.no_match(id, 2),
            StoreError::InsufficientStock {
                product_id: id,
                requested: 2,
            }
        );
        for operation in [StockOperation::Release, StockOperation::Confirm] {
            assert_eq!(
                operation.no_match(id, 2),
                StoreError::InvariantViolation {
                    product_id: id,
                    operation,
                    quantity: 2,
                }
            );
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(StockOperation::Reserve.as_str(), "reserve");
        assert_eq!(StockOperation::Confirm.to_string(), "confirm");
    }
}
