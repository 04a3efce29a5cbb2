//! Order creation saga step names.
//!
//! Used in timeout errors, log fields and metric labels.

/// Step name: Fetch the product snapshot from inventory.
pub const STEP_GET_PRODUCT: &str = "get_product";

/// Step name: Reserve stock for the order.
pub const STEP_RESERVE_STOCK: &str = "reserve_stock";

/// Step name: Persist the order in the ledger.
pub const STEP_PERSIST_ORDER: &str = "persist_order";

/// Step name: Release a reservation after a later step failed.
pub const STEP_RELEASE_STOCK: &str = "release_stock";

/// Step name: Load an existing order.
pub const STEP_LOAD_ORDER: &str = "load_order";

/// Step name: Load all orders.
pub const STEP_LIST_ORDERS: &str = "list_orders";

/// Step name: Deduct reserved stock when an order completes.
pub const STEP_CONFIRM_STOCK: &str = "confirm_stock";

/// Step name: Write new order/payment status.
pub const STEP_UPDATE_STATUS: &str = "update_status";
