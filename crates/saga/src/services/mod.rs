//! Collaborators the saga calls across the service boundary.

pub mod http;
pub mod inventory;

pub use http::HttpInventoryClient;
pub use inventory::{InMemoryInventoryClient, InventoryCall, InventoryClient, StockRequest};
