//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::Serialize;

use super::{OrderError, OrderStatus, PaymentStatus, StatusPair};

/// Order aggregate root.
///
/// Holds a frozen snapshot of the product name and unit price taken when the
/// order was placed; it never re-reads live product state. Serialize-only:
/// stored orders come back through [`OrderRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    /// Assigned by the order store on creation.
    id: Option<OrderId>,
    user_id: UserId,
    product_id: ProductId,
    product_name: String,
    unit_price: Money,
    quantity: i32,
    total_price: Money,
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `Pending`/`Pending` state.
    ///
    /// The total price is computed once as `unit_price × quantity`.
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: i32,
    ) -> Result<Self, OrderError> {
        if !user_id.is_positive() {
            return Err(OrderError::InvalidUserId(user_id));
        }
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity { quantity });
        }
        let total_price = unit_price
            .checked_multiply(quantity)
            .ok_or(OrderError::TotalOverflow {
                unit_price,
                quantity,
            })?;

        Ok(Self {
            id: None,
            user_id,
            product_id,
            product_name: product_name.into(),
            unit_price,
            quantity,
            total_price,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: Utc::now(),
        })
    }

    /// Stamps the identity and creation time assigned by a store.
    pub fn with_identity(mut self, id: OrderId, created_at: DateTime<Utc>) -> Self {
        self.id = Some(id);
        self.created_at = created_at;
        self
    }

    // Accessors

    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn order_status(&self) -> OrderStatus {
        self.order_status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn statuses(&self) -> StatusPair {
        StatusPair::new(self.order_status, self.payment_status)
    }

    // Transitions

    /// Marks the order as paid.
    pub fn pay(&mut self) -> Result<(), OrderError> {
        if self.order_status == OrderStatus::Cancelled
            || self.payment_status == PaymentStatus::Paid
        {
            return Err(self.invalid_transition("pay"));
        }
        self.payment_status = PaymentStatus::Paid;
        Ok(())
    }

    /// Completes a paid order. Cancelled orders stay cancelled.
    pub fn complete(&mut self) -> Result<(), OrderError> {
        if self.payment_status != PaymentStatus::Paid
            || self.order_status == OrderStatus::Cancelled
        {
            return Err(self.invalid_transition("complete"));
        }
        self.order_status = OrderStatus::Completed;
        Ok(())
    }

    /// Cancels an order that has not been completed.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.order_status == OrderStatus::Completed {
            return Err(self.invalid_transition("cancel"));
        }
        self.order_status = OrderStatus::Cancelled;
        Ok(())
    }

    fn invalid_transition(&self, action: &'static str) -> OrderError {
        OrderError::InvalidTransition {
            action,
            order_status: self.order_status,
            payment_status: self.payment_status,
        }
    }
}

/// Column values of a persisted order.
///
/// Stores rehydrate orders through this type; it bypasses construction
/// validation because the row was validated when it was first written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i32,
    pub total_price: Money,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Self {
            id: Some(record.id),
            user_id: record.user_id,
            product_id: record.product_id,
            product_name: record.product_name,
            unit_price: record.unit_price,
            quantity: record.quantity,
            total_price: record.total_price,
            order_status: record.order_status,
            payment_status: record.payment_status,
            created_at: record.created_at,
        }
    }
}
