//! Merchbot - Telegram merch shop bot for a cycling club
//!
//! Customers browse the catalog, collect a cart, check out through a guided
//! conversation and pay by bank transfer with a photo proof. Admins confirm payments,
//! move orders through their statuses and send broadcasts.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging and shared value types
//! - `storage`: SQLite pool, migrations and per-table queries
//! - `shop`: adding products to the cart, including per-product questions
//! - `checkout`: the checkout conversation and order creation
//! - `delivery`: pickup-point resolver and its HTTP client
//! - `telegram`: bot setup, handler tree and screens

#![allow(clippy::too_many_arguments)]

pub mod checkout;
pub mod cli;
pub mod core;
pub mod delivery;
pub mod i18n;
pub mod shop;
pub mod storage;
pub mod telegram;

// Re-export commonly used types for convenience
pub use checkout::{Checkout, CheckoutReply};
pub use core::{config, AppError, AppResult};
pub use delivery::{PickupPointResolver, SharedResolver};
pub use shop::Shop;
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
pub use telegram::{schema, HandlerDeps};
