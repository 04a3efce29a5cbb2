//! Domain error types.

use std::time::Duration;

use common::{OrderId, ProductId};
use thiserror::Error;

use crate::order::OrderError;
use crate::product::ProductError;
use crate::store::StockOperation;

/// Errors reported by order and product stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A reservation matched no row with enough available stock.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: i32 },

    /// A release or confirm matched no row.
    ///
    /// Correct orchestration never triggers this; it signals reserved stock
    /// that has drifted from the orders that hold it.
    #[error("Stock invariant violated: cannot {operation} {quantity} units of product {product_id}")]
    InvariantViolation {
        product_id: ProductId,
        operation: StockOperation,
        quantity: i32,
    },

    /// A conditional status update found the order in other statuses than
    /// the caller loaded.
    #[error("Order {id} was modified concurrently")]
    StatusConflict { id: OrderId },

    /// Any other persistence failure.
    #[error("Internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn order_not_found(id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            entity: "order",
            id: id.into(),
        }
    }

    pub fn product_not_found(id: impl Into<i64>) -> Self {
        StoreError::NotFound {
            entity: "product",
            id: id.into(),
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An order aggregate rule was violated.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A product aggregate rule was violated.
    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    /// The store rejected or failed the operation.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The operation did not finish within its time budget.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}
