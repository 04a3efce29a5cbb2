//! Order-creation saga across the order ledger and the product inventory.
//!
//! The saga follows these steps:
//! 1. Fetch the product snapshot (name, price) from inventory
//! 2. Reserve stock
//! 3. Build the order from the snapshot
//! 4. Persist the order
//!
//! If step 3 or 4 fails, the reservation is released before the error is
//! returned. This crate also carries the order lifecycle (pay, complete,
//! cancel) since completing and cancelling settle the reservation.

pub mod coordinator;
pub mod error;
pub mod order_creation;
pub mod services;
pub mod usecase;

pub use coordinator::{OrderSaga, SagaConfig};
pub use error::SagaError;
pub use services::{
    HttpInventoryClient, InMemoryInventoryClient, InventoryCall, InventoryClient, StockRequest,
};
pub use usecase::{Instrumented, OrderUseCase};
