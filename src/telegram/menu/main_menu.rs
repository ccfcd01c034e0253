use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};
use unic_langid::LanguageIdentifier;

use crate::core::error::AppResult;
use crate::i18n;
use crate::storage::{get_connection, membership, orders, users};
use crate::telegram::callback::CallbackAction;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::{cb, Bot};

/// Buttons of the persistent reply keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    Shop,
    Cart,
    Orders,
    Promos,
    About,
    Stats,
}

impl MenuButton {
    pub const ALL: [MenuButton; 6] = [
        MenuButton::Shop,
        MenuButton::Cart,
        MenuButton::Orders,
        MenuButton::Promos,
        MenuButton::About,
        MenuButton::Stats,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MenuButton::Shop => "menu-button-shop",
            MenuButton::Cart => "menu-button-cart",
            MenuButton::Orders => "menu-button-orders",
            MenuButton::Promos => "menu-button-promos",
            MenuButton::About => "menu-button-about",
            MenuButton::Stats => "menu-button-stats",
        }
    }

    /// Matches a tapped label in any supported language, the keyboard may predate a language change
    pub fn from_label(text: &str) -> Option<Self> {
        let text = text.trim();
        i18n::SUPPORTED_LANGS.iter().find_map(|(code, _)| {
            let lang = i18n::lang_from_code(code);
            MenuButton::ALL
                .into_iter()
                .find(|button| i18n::t(&lang, button.key()) == text)
        })
    }
}

pub fn main_keyboard(lang: &LanguageIdentifier) -> KeyboardMarkup {
    let button = |b: MenuButton| KeyboardButton::new(i18n::t(lang, b.key()));
    KeyboardMarkup::new(vec![
        vec![button(MenuButton::Shop), button(MenuButton::Cart)],
        vec![button(MenuButton::Orders), button(MenuButton::Promos)],
        vec![button(MenuButton::About), button(MenuButton::Stats)],
    ])
    .resize_keyboard()
}

/// Sends the reply keyboard; `name` switches to the welcome text of /start
pub async fn show_main_menu(bot: &Bot, chat_id: ChatId, lang: &LanguageIdentifier, name: Option<&str>) -> AppResult<()> {
    let text = match name {
        Some(name) => {
            let mut args = FluentArgs::new();
            args.set("name", name.to_string());
            i18n::t_args(lang, "menu-welcome", &args)
        }
        None => i18n::t(lang, "menu-main"),
    };
    bot.send_message(chat_id, text).reply_markup(main_keyboard(lang)).await?;
    Ok(())
}

pub async fn show_about(bot: &Bot, chat_id: ChatId, lang: &LanguageIdentifier) -> AppResult<()> {
    bot.send_message(chat_id, i18n::t(lang, "about-text")).await?;
    Ok(())
}

fn consent_keyboard(lang: &LanguageIdentifier, consent: bool) -> InlineKeyboardMarkup {
    let key = if consent { "consent-button-off" } else { "consent-button-on" };
    InlineKeyboardMarkup::new(vec![vec![cb(i18n::t(lang, key), CallbackAction::ToggleConsent)]])
}

/// Channel days, order count and the broadcast consent toggle
pub async fn show_stats(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps, lang: &LanguageIdentifier) -> AppResult<()> {
    let (days, order_count, subscribed, consent) = {
        let conn = get_connection(&deps.db_pool)?;
        let consent = users::get_user_by_telegram_id(&conn, chat_id.0)?
            .map(|u| u.consent_to_broadcast)
            .unwrap_or(false);
        (
            membership::get_total_subscription_days(&conn, chat_id.0)?,
            orders::count_orders_for_user(&conn, chat_id.0)?,
            membership::is_subscribed(&conn, chat_id.0)?,
            consent,
        )
    };

    let mut args = FluentArgs::new();
    args.set("days", days);
    args.set("orders", order_count);
    let mut text = i18n::t_args(lang, "stats-text", &args);
    if deps.channel_id.is_some() {
        let key = if subscribed { "stats-subscribed" } else { "stats-not-subscribed" };
        text.push_str("\n\n");
        text.push_str(&i18n::t(lang, key));
    }

    bot.send_message(chat_id, text)
        .reply_markup(consent_keyboard(lang, consent))
        .await?;
    Ok(())
}

pub async fn toggle_consent(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps, lang: &LanguageIdentifier) -> AppResult<()> {
    let consent = {
        let conn = get_connection(&deps.db_pool)?;
        users::toggle_broadcast_consent(&conn, chat_id.0)?
    };
    log::info!("🔔 User {} broadcast consent: {}", chat_id.0, consent);
    let key = if consent { "consent-enabled" } else { "consent-disabled" };
    bot.send_message(chat_id, i18n::t(lang, key))
        .reply_markup(consent_keyboard(lang, consent))
        .await?;
    Ok(())
}
