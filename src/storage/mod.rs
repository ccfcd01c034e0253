//! Database access: connection pool, migrations and per-table queries

pub mod broadcasts;
pub mod cart;
pub mod catalog;
pub mod db;
pub mod membership;
pub mod migrations;
pub mod orders;
pub mod promo;
pub mod seed;
pub mod users;

// Re-exports for convenience
pub use db::{create_pool, get_connection, DbConnection, DbPool};
