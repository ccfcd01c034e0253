//! Plain text, photo and channel membership updates

use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;

use super::types::{telegram_id, HandlerDeps};
use crate::checkout::CheckoutReply;
use crate::core::error::AppResult;
use crate::i18n;
use crate::storage::{get_connection, membership, users};
use crate::telegram::checkout_ui::{self, photo_reference};
use crate::telegram::menu::{self, catalog, show_main_menu, MenuButton};
use crate::telegram::Bot;

/// Routes a text message.
///
/// Order: unknown commands, reply keyboard buttons, product questions, checkout input,
/// and finally the main menu as a hint.
pub async fn handle_text(bot: &Bot, msg: &Message, deps: &HandlerDeps, text: &str) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let lang = i18n::user_lang_from_pool(&deps.db_pool, chat_id.0);
    let text = text.trim();

    if text.starts_with('/') {
        log::debug!("Unknown command from {}: {}", chat_id.0, text);
        return show_main_menu(bot, chat_id, &lang, None).await;
    }

    if let Some(button) = MenuButton::from_label(text) {
        return menu::open(bot, chat_id, deps, &lang, button).await;
    }

    if catalog::handle_answer(bot, chat_id, deps, &lang, text).await? {
        return Ok(());
    }

    let reply = deps.checkout.handle_text(chat_id.0, text).await;
    if checkout_ui::deliver(bot, chat_id, deps, &lang, reply).await? {
        return Ok(());
    }

    show_main_menu(bot, chat_id, &lang, None).await
}

/// A photo is only meaningful as a payment proof during checkout
pub async fn handle_photo(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let lang = i18n::user_lang_from_pool(&deps.db_pool, chat_id.0);

    if let Some(reference) = msg.photo().and_then(photo_reference) {
        let reply = deps.checkout.handle_photo(chat_id.0, &reference).await;
        if checkout_ui::deliver(bot, chat_id, deps, &lang, reply).await? {
            return Ok(());
        }
    }

    show_main_menu(bot, chat_id, &lang, None).await
}

/// Documents, stickers and the like; during checkout the current question is repeated
pub async fn handle_unsupported(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let reply = deps.checkout.handle_unsupported(chat_id.0).await;
    if matches!(reply, CheckoutReply::Ignored) {
        log::debug!("Ignoring unsupported message from {}", chat_id.0);
        return Ok(());
    }

    let lang = i18n::user_lang_from_pool(&deps.db_pool, chat_id.0);
    checkout_ui::deliver(bot, chat_id, deps, &lang, reply).await?;
    Ok(())
}

/// Membership transition seen in a `chat_member` update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    Joined,
    Left,
}

pub fn membership_change(was_present: bool, is_present: bool) -> Option<MembershipChange> {
    match (was_present, is_present) {
        (false, true) => Some(MembershipChange::Joined),
        (true, false) => Some(MembershipChange::Left),
        _ => None,
    }
}

/// Records joins and leaves of the tracked channel
pub fn handle_channel_member(deps: &HandlerDeps, update: &ChatMemberUpdated) -> AppResult<()> {
    let member = &update.new_chat_member.user;
    if member.is_bot {
        return Ok(());
    }
    let Some(change) = membership_change(
        update.old_chat_member.kind.is_present(),
        update.new_chat_member.kind.is_present(),
    ) else {
        return Ok(());
    };

    let member_id = telegram_id(member);
    let conn = get_connection(&deps.db_pool)?;
    users::upsert_user(&conn, &users::TelegramProfile::from_user(member))?;

    match change {
        MembershipChange::Joined => {
            membership::record_user_join(&conn, member_id)?;
            log::info!("👋 User {} joined channel {}", member_id, update.chat.id.0);
        }
        MembershipChange::Left => {
            let days = membership::record_user_leave(&conn, member_id)?;
            log::info!(
                "🚪 User {} left channel {} after {} days",
                member_id,
                update.chat.id.0,
                days.unwrap_or(0)
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_change() {
        assert_eq!(membership_change(false, true), Some(MembershipChange::Joined));
        assert_eq!(membership_change(true, false), Some(MembershipChange::Left));
        assert_eq!(membership_change(true, true), None);
        assert_eq!(membership_change(false, false), None);
    }
}
