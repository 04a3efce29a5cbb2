//! Product aggregate and the inventory use case.

mod aggregate;
mod service;

pub use aggregate::{NewProduct, Product, ProductRecord, ProductView, max_price};
pub use service::ProductService;

use common::{Money, ProductId};
use thiserror::Error;

use crate::store::StockOperation;

/// Errors raised by the product aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    /// Stock quantities in a request must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i32 },

    /// Total stock cannot be negative.
    #[error("Invalid total quantity: {total_qty} (must not be negative)")]
    NegativeStock { total_qty: i32 },

    /// Product price cannot be negative.
    #[error("Invalid price: {0} (must not be negative)")]
    NegativePrice(Money),

    /// Product price exceeds what the inventory can store.
    #[error("Invalid price: {0} (must not exceed 9999999999.99)")]
    PriceTooLarge(Money),

    /// Product name is required.
    #[error("Product name is required")]
    NameRequired,

    /// Not enough unreserved stock for a reservation.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i32,
    },

    /// A release or confirm asked for more than is currently reserved.
    #[error(
        "Cannot {operation} {requested} units of product {product_id}: only {reserved} reserved"
    )]
    ExceedsReserved {
        product_id: ProductId,
        operation: StockOperation,
        requested: i32,
        reserved: i32,
    },

    /// Stored quantities break `0 <= reserved <= total`.
    #[error("Corrupt stock for product {product_id}: total {total_qty}, reserved {reserved_qty}")]
    CorruptStock {
        product_id: ProductId,
        total_qty: i32,
        reserved_qty: i32,
    },
}
