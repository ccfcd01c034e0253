use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};

use crate::core::config::admin::ADMIN_IDS;
use crate::core::error::AppResult;
use crate::core::types::{format_total, OrderStatus};
use crate::i18n;
use crate::storage::orders::{self, Order, OrderItem};
use crate::storage::{get_connection, users, DbPool};
use crate::telegram::checkout_ui::photo_file_id;
use crate::telegram::menu::status_label;
use crate::telegram::Bot;

/// Admin notice text for a freshly created order
pub fn new_order_text(lang: &unic_langid::LanguageIdentifier, order: &Order, items: &[OrderItem], user: &str) -> String {
    let item_lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "• {} × {} = {}",
                item.display_name(),
                item.quantity,
                format_total(item.line_total())
            )
        })
        .collect();

    let or_dash = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("-")
            .to_string()
    };

    let mut args = FluentArgs::new();
    args.set("id", order.id);
    args.set("name", or_dash(&order.customer_name));
    args.set("user", user.to_string());
    args.set("phone", or_dash(&order.phone));
    args.set("city", or_dash(&order.city_country));
    args.set("comment", or_dash(&order.comment));
    args.set("items", item_lines.join("\n"));
    args.set("total", format_total(order.total_amount));
    i18n::t_args(lang, "admin-new-order", &args)
}

/// Order, its items and the customer's handle
fn load_order(db_pool: &DbPool, order_id: i64) -> AppResult<Option<(Order, Vec<OrderItem>, String)>> {
    let conn = get_connection(db_pool)?;
    let Some(order) = orders::get_order_by_id(&conn, order_id)? else {
        return Ok(None);
    };
    let items = orders::get_order_items(&conn, order_id)?;
    let user = users::get_user_by_telegram_id(&conn, order.telegram_id)?
        .and_then(|u| u.username)
        .map(|username| format!("@{}", username))
        .unwrap_or_else(|| format!("id {}", order.telegram_id));
    Ok(Some((order, items, user)))
}

/// Sends the new order with its payment screenshot to every admin.
///
/// Failures are logged; the customer flow never depends on them.
pub async fn notify_admins_new_order(bot: &Bot, db_pool: &DbPool, order_id: i64) {
    if ADMIN_IDS.is_empty() {
        log::warn!("Order #{} created but ADMIN_IDS is empty, nobody is notified", order_id);
        return;
    }

    let (order, items, user) = match load_order(db_pool, order_id) {
        Ok(Some(loaded)) => loaded,
        Ok(None) => {
            log::error!("Order #{} vanished before the admin notice", order_id);
            return;
        }
        Err(e) => {
            log::error!("Failed to load order #{} for the admin notice: {}", order_id, e);
            return;
        }
    };

    for admin_id in ADMIN_IDS.iter() {
        let chat_id = ChatId(*admin_id);
        let lang = i18n::user_lang_from_pool(db_pool, *admin_id);
        let text = new_order_text(&lang, &order, &items, &user);

        if let Err(e) = bot.send_message(chat_id, text).await {
            log::error!("Failed to notify admin {} about order #{}: {}", admin_id, order_id, e);
            continue;
        }

        if let Some(file_id) = order.payment_proof_url.as_deref().and_then(photo_file_id) {
            let photo = InputFile::file_id(FileId(file_id.to_string()));
            if let Err(e) = bot
                .send_photo(chat_id, photo)
                .caption(format!("#{}", order.id))
                .await
            {
                log::error!("Failed to forward payment proof of order #{} to admin {}: {}", order_id, admin_id, e);
            }
        }
    }
    log::info!("📨 Admins notified about order #{}", order_id);
}

/// Tells the customer their order changed status
pub async fn notify_status_changed(bot: &Bot, db_pool: &DbPool, order: &Order, status: OrderStatus) -> AppResult<()> {
    let lang = i18n::user_lang_from_pool(db_pool, order.telegram_id);
    let mut args = FluentArgs::new();
    args.set("id", order.id);
    args.set("status", status_label(&lang, status));
    bot.send_message(ChatId(order.telegram_id), i18n::t_args(&lang, "order-status-changed", &args))
        .await?;
    Ok(())
}

/// Tells the customer the transfer was confirmed
pub async fn notify_payment_confirmed(bot: &Bot, db_pool: &DbPool, order: &Order) -> AppResult<()> {
    let lang = i18n::user_lang_from_pool(db_pool, order.telegram_id);
    let mut args = FluentArgs::new();
    args.set("id", order.id);
    bot.send_message(
        ChatId(order.telegram_id),
        i18n::t_args(&lang, "order-payment-confirmed-notice", &args),
    )
    .await?;
    Ok(())
}
