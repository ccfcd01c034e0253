//! Telegram bot integration and handlers

pub mod admin;
pub mod bot;
pub mod broadcast;
pub mod callback;
pub mod checkout_ui;
pub mod handlers;
pub mod menu;
pub mod notifications;

use teloxide::types::InlineKeyboardButton;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use callback::CallbackAction;
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use menu::{handle_callback, show_main_menu};

pub type Bot = teloxide::Bot;

/// Inline button carrying an encoded [`CallbackAction`]
pub fn cb(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.encode())
}
