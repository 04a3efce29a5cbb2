//! Saga error types.

use common::{OrderId, ProductId};
use domain::{OrderError, StoreError};
use thiserror::Error;

/// Errors that can occur while creating or transitioning an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SagaError {
    /// The inventory service does not know the product.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Not enough unreserved stock to satisfy the order.
    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: ProductId, requested: i32 },

    /// Transport failure or unexpected response from the inventory service.
    #[error("Inventory service error: {0}")]
    InventoryService(String),

    /// The order aggregate rejected the request or transition.
    #[error("{0}")]
    InvalidOrder(#[from] OrderError),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Another call changed the order between load and write.
    #[error("Order {0} was modified concurrently")]
    Conflict(OrderId),

    /// The order store failed.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// A step did not finish before the deadline.
    #[error("Saga step '{step}' timed out")]
    Timeout { step: &'static str },
}

impl SagaError {
    /// Short, stable classification used for metric labels and HTTP mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            SagaError::ProductNotFound(_) | SagaError::OrderNotFound(_) => "not_found",
            SagaError::Store(StoreError::NotFound { .. }) => "not_found",
            SagaError::InvalidOrder(e) if e.is_invalid_input() => "invalid_input",
            SagaError::InvalidOrder(_) | SagaError::Conflict(_) => "invalid_transition",
            SagaError::Store(StoreError::StatusConflict { .. }) => "invalid_transition",
            SagaError::InsufficientStock { .. } => "insufficient_stock",
            SagaError::Store(StoreError::InsufficientStock { .. }) => "insufficient_stock",
            SagaError::InventoryService(_) | SagaError::Store(_) => "internal",
            SagaError::Timeout { .. } => "timeout",
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
