//! Order aggregate and related types.

mod aggregate;
mod status;

pub use aggregate::{Order, OrderRecord};
pub use status::{OrderStatus, PaymentStatus, StatusPair, UnknownStatus};

use common::{Money, UserId};
use thiserror::Error;

/// Errors raised by the order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// User ID must be positive.
    #[error("Invalid user id: {0}")]
    InvalidUserId(UserId),

    /// Quantity must be positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: i32 },

    /// `unit_price × quantity` does not fit in a money amount.
    #[error("Order total overflows: {unit_price} x {quantity}")]
    TotalOverflow { unit_price: Money, quantity: i32 },

    /// The requested status change is not legal from the current state.
    #[error(
        "Invalid state transition: cannot {action} order in {order_status}/{payment_status} state"
    )]
    InvalidTransition {
        action: &'static str,
        order_status: OrderStatus,
        payment_status: PaymentStatus,
    },
}

impl OrderError {
    /// Returns true for construction-time validation failures.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, OrderError::InvalidTransition { .. })
    }
}
