//! Database layer - connection pool, migrations, repositories
//!
//! # Design Principles
//!
//! - Workflows talk to `dyn Store`, never to the pool directly
//! - All list operations use JOINs - no N+1 queries
//! - Rely on DB constraints and conditional updates - no check-then-insert
//! - Order status writes are compare-and-set on the previous status

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repos;
pub mod store;

pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with_options};
pub use repos::PgStore;
pub use store::{DbError, NewAttachment, NewOrder, NewUser, OrderListQuery, OrderScope, Store};
