//! Store implementations for the order and inventory services.
//!
//! - [`memory`]: lock-protected maps, used by tests and by the binaries when
//!   no database is configured
//! - [`postgres`]: `sqlx`-backed stores whose stock operations are single
//!   conditional `UPDATE` statements

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryOrderStore, InMemoryProductStore};
pub use postgres::{PostgresOrderStore, PostgresProductStore, run_migrations};
