//! Slash command handlers

use teloxide::prelude::*;
use unic_langid::LanguageIdentifier;

use super::types::HandlerDeps;
use crate::core::error::AppResult;
use crate::i18n;
use crate::telegram::admin::handle_admin_command;
use crate::telegram::bot::Command;
use crate::telegram::menu::{self, show_main_menu, MenuButton};
use crate::telegram::Bot;

/// Dispatches a parsed command
pub async fn handle_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, cmd: Command) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let lang = i18n::user_lang_from_pool(&deps.db_pool, chat_id.0);

    if cmd.is_admin_only() {
        return handle_admin_command(bot, msg, deps, cmd).await;
    }

    match cmd {
        Command::Start => {
            let first_name = msg.from.as_ref().map(|u| u.first_name.as_str());
            show_main_menu(bot, chat_id, &lang, first_name).await
        }
        Command::Menu => show_main_menu(bot, chat_id, &lang, None).await,
        Command::Cart => menu::open(bot, chat_id, deps, &lang, MenuButton::Cart).await,
        Command::Orders => menu::open(bot, chat_id, deps, &lang, MenuButton::Orders).await,
        Command::Cancel => handle_cancel(bot, chat_id, deps, &lang).await,
        _ => Ok(()),
    }
}

/// Aborts whatever flow the user is in; the cart is left untouched
async fn handle_cancel(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
) -> AppResult<()> {
    let checkout_aborted = deps.checkout.abort(chat_id.0).await;
    let questions_aborted = deps.shop.abort(chat_id.0).await;

    if checkout_aborted || questions_aborted {
        log::info!("User {} cancelled the running flow", chat_id.0);
        bot.send_message(chat_id, i18n::t(lang, "checkout-cancelled"))
            .reply_markup(menu::main_keyboard(lang))
            .await?;
        Ok(())
    } else {
        show_main_menu(bot, chat_id, lang, None).await
    }
}
