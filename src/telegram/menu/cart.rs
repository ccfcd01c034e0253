use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId};
use unic_langid::LanguageIdentifier;

use crate::core::error::AppResult;
use crate::core::types::format_total;
use crate::i18n;
use crate::storage::cart::{self, CartItem};
use crate::storage::get_connection;
use crate::telegram::callback::CallbackAction;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::{cb, Bot};

/// Text and keyboard of the cart screen; `None` keyboard for an empty cart
pub fn cart_view(lang: &LanguageIdentifier, items: &[CartItem]) -> (String, Option<InlineKeyboardMarkup>) {
    if items.is_empty() {
        return (i18n::t(lang, "cart-empty"), None);
    }

    let mut lines = vec![i18n::t(lang, "cart-title"), String::new()];
    for item in items {
        let mut args = FluentArgs::new();
        let name = if item.is_preorder {
            format!("⏳ {}", item.display_name())
        } else {
            item.display_name()
        };
        args.set("name", name);
        args.set("quantity", item.quantity);
        args.set("sum", format_total(item.line_total()));
        lines.push(i18n::t_args(lang, "cart-line", &args));
    }

    lines.push(String::new());
    let mut args = FluentArgs::new();
    args.set("total", format_total(cart::cart_total(items)));
    lines.push(i18n::t_args(lang, "cart-total", &args));
    if items.iter().any(|item| item.is_preorder) {
        lines.push(i18n::t(lang, "cart-preorder-note"));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = items
        .iter()
        .map(|item| vec![cb(format!("❌ {}", item.display_name()), CallbackAction::RemoveLine(item.id))])
        .collect();
    rows.push(vec![cb(i18n::t(lang, "cart-clear"), CallbackAction::ClearCart)]);
    rows.push(vec![cb(i18n::t(lang, "cart-checkout"), CallbackAction::StartCheckout)]);

    (lines.join("\n"), Some(InlineKeyboardMarkup::new(rows)))
}

/// Shows the cart, editing `edit` in place when it refers to the previous cart message
pub async fn show_cart(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    edit: Option<MessageId>,
) -> AppResult<()> {
    let items = {
        let conn = get_connection(&deps.db_pool)?;
        cart::get_cart_items(&conn, chat_id.0)?
    };
    let (text, keyboard) = cart_view(lang, &items);

    if let Some(message_id) = edit {
        let request = bot.edit_message_text(chat_id, message_id, &text);
        let result = match keyboard.clone() {
            Some(keyboard) => request.reply_markup(keyboard).await,
            None => request.await,
        };
        match result {
            Ok(_) => return Ok(()),
            // photos or stale messages can't be edited, fall back to a fresh message
            Err(e) => log::debug!("Cart message {} not edited: {}", message_id.0, e),
        }
    }

    let request = bot.send_message(chat_id, text);
    match keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };
    Ok(())
}

pub async fn remove_line(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    line_id: i64,
    message_id: Option<MessageId>,
) -> AppResult<()> {
    let removed = {
        let conn = get_connection(&deps.db_pool)?;
        cart::remove_from_cart(&conn, line_id, chat_id.0)?
    };
    if !removed {
        bot.send_message(chat_id, i18n::t(lang, "cart-remove-failed")).await?;
    }
    show_cart(bot, chat_id, deps, lang, message_id).await
}

pub async fn clear(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    message_id: Option<MessageId>,
) -> AppResult<()> {
    let removed = {
        let conn = get_connection(&deps.db_pool)?;
        cart::clear_cart(&conn, chat_id.0)?
    };
    log::info!("🗑 User {} cleared the cart ({} lines)", chat_id.0, removed);

    if let Some(message_id) = message_id {
        if bot
            .edit_message_text(chat_id, message_id, i18n::t(lang, "cart-cleared"))
            .await
            .is_ok()
        {
            return Ok(());
        }
    }
    bot.send_message(chat_id, i18n::t(lang, "cart-cleared")).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use unic_langid::langid;

    fn item(id: i64, name: &str, price: i64, quantity: i64, is_preorder: bool) -> CartItem {
        CartItem {
            id,
            product_id: id,
            product_name: name.to_string(),
            price: Decimal::new(price, 0),
            currency: "RUB".to_string(),
            is_preorder,
            variant_id: None,
            variant_name: None,
            gender: None,
            answers: Vec::new(),
            quantity,
            added_at: String::new(),
        }
    }

    #[test]
    fn test_empty_cart_has_no_buttons() {
        let (text, keyboard) = cart_view(&langid!("en"), &[]);
        assert_eq!(text, "🛒 Your cart is empty");
        assert!(keyboard.is_none());
    }

    #[test]
    fn test_cart_lists_lines_and_total() {
        let items = vec![item(1, "Cap", 800, 2, false), item(2, "Bottle", 600, 1, true)];
        let (text, keyboard) = cart_view(&langid!("en"), &items);

        assert!(text.contains("Cap × 2 = 1600 RUB"));
        assert!(text.contains("⏳ Bottle × 1 = 600 RUB"));
        assert!(text.contains("Total: 2200 RUB"));
        assert!(text.contains("preorder"));

        let keyboard = keyboard.unwrap();
        // one remove button per line, clear, checkout
        assert_eq!(keyboard.inline_keyboard.len(), 4);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "❌ Cap");
    }
}
