//! Domain layer for the order and inventory services.
//!
//! This crate provides:
//! - the Order aggregate with its order/payment status machines
//! - the Product aggregate with the `0 <= reserved <= total` stock invariant
//! - the store contracts both services persist through
//! - the inventory-side use case (`ProductService`)

pub mod error;
pub mod order;
pub mod product;
pub mod store;

pub use error::{DomainError, StoreError};
pub use order::{Order, OrderError, OrderRecord, OrderStatus, PaymentStatus, StatusPair};
pub use product::{NewProduct, Product, ProductError, ProductRecord, ProductService, ProductView};
pub use store::{OrderStore, ProductStore, StockOperation};
