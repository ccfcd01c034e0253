//! Menu screens: main keyboard, catalog, cart, orders, promo codes, stats

mod callback_router;
pub mod cart;
pub mod catalog;
mod main_menu;
pub mod orders;
pub mod promo;

use teloxide::prelude::*;
use unic_langid::LanguageIdentifier;

use crate::core::error::AppResult;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::Bot;

pub use callback_router::handle_callback;
pub use main_menu::{main_keyboard, show_about, show_main_menu, show_stats, toggle_consent, MenuButton};
pub use orders::status_label;

/// Opens the screen behind a reply keyboard button
pub async fn open(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    button: MenuButton,
) -> AppResult<()> {
    match button {
        MenuButton::Shop => catalog::show_catalog(bot, chat_id, deps, lang).await,
        MenuButton::Cart => cart::show_cart(bot, chat_id, deps, lang, None).await,
        MenuButton::Orders => orders::show_orders(bot, chat_id, deps, lang).await,
        MenuButton::Promos => promo::show_promos(bot, chat_id, deps, lang).await,
        MenuButton::About => show_about(bot, chat_id, lang).await,
        MenuButton::Stats => show_stats(bot, chat_id, deps, lang).await,
    }
}
