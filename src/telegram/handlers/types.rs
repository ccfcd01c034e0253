//! Handler types, dependencies, and user management helpers

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::User;

use crate::checkout::Checkout;
use crate::core::error::AppError;
use crate::delivery::SharedResolver;
use crate::i18n;
use crate::shop::Shop;
use crate::storage::users::{self, TelegramProfile};
use crate::storage::{get_connection, DbPool};
use crate::telegram::Bot;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub checkout: Arc<Checkout<SharedResolver>>,
    pub shop: Arc<Shop>,
    /// Channel whose membership is tracked, if any
    pub channel_id: Option<i64>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<DbPool>, resolver: SharedResolver, lookup_enabled: bool, channel_id: Option<i64>) -> Self {
        let checkout = Checkout::new(DbPool::clone(&db_pool), resolver, lookup_enabled);
        let shop = Shop::new(DbPool::clone(&db_pool));
        Self {
            db_pool,
            checkout: Arc::new(checkout),
            shop: Arc::new(shop),
            channel_id,
        }
    }
}

/// Telegram user id as stored in the registry
pub fn telegram_id(user: &User) -> i64 {
    i64::try_from(user.id.0).unwrap_or(0)
}

/// Registers or refreshes the sender of an update. Failures are logged only,
/// the update itself is still handled.
pub fn register_user(db_pool: &DbPool, user: &User) {
    if user.is_bot {
        return;
    }
    let profile = TelegramProfile::from_user(user);
    let result = get_connection(db_pool).and_then(|conn| users::upsert_user(&conn, &profile));
    if let Err(e) = result {
        log::error!("Failed to upsert user {}: {}", profile.telegram_id, e);
    }
}

/// Logs a failed endpoint and tells the user something went wrong.
///
/// Delivery failures mean the user blocked the bot: the user is marked blocked
/// and nothing is sent back.
pub async fn report_error(bot: &Bot, db_pool: &DbPool, chat_id: ChatId, context: &str, err: AppError) {
    if err.is_delivery_failure() {
        log::warn!("User {} is unreachable during {}: {}", chat_id.0, context, err);
        if let Ok(conn) = get_connection(db_pool) {
            if let Err(e) = users::mark_user_blocked(&conn, chat_id.0) {
                log::error!("Failed to mark user {} blocked: {}", chat_id.0, e);
            }
        }
        return;
    }

    log::error!("❌ {} failed for chat {}: {}", context, chat_id.0, err);
    let lang = i18n::user_lang_from_pool(db_pool, chat_id.0);
    if let Err(e) = bot.send_message(chat_id, i18n::t(&lang, "errors-generic")).await {
        log::error!("Failed to send error notice to chat {}: {}", chat_id.0, e);
    }
}
