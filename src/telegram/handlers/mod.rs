//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the bot. The handler
//! tree is built from [`HandlerDeps`] only, so tests can build the same tree as production.

mod commands;
mod messages;
mod schema;
mod types;

pub use messages::{membership_change, MembershipChange};
pub use schema::schema;
pub use types::{register_user, report_error, telegram_id, HandlerDeps, HandlerError};
