use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use unic_langid::LanguageIdentifier;

use crate::core::error::AppResult;
use crate::core::types::{format_total, OrderStatus};
use crate::i18n;
use crate::storage::orders::{self, OrderWithItems};
use crate::storage::{get_connection, promo};
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::Bot;

const HISTORY_LIMIT: usize = 10;

pub fn status_label(lang: &LanguageIdentifier, status: OrderStatus) -> String {
    i18n::t(lang, &format!("order-status-{}", status.as_str()))
}

/// Order history text, newest first
pub fn history_text(lang: &LanguageIdentifier, history: &[OrderWithItems]) -> String {
    if history.is_empty() {
        return i18n::t(lang, "orders-empty");
    }

    let mut blocks = vec![i18n::t(lang, "orders-title")];
    for entry in history {
        let order = &entry.order;
        let mut args = FluentArgs::new();
        args.set("emoji", order.status.emoji());
        args.set("id", order.id);
        args.set(
            "date",
            promo::format_date(&order.created_at).unwrap_or_else(|| order.created_at.clone()),
        );
        args.set("status", status_label(lang, order.status));
        args.set("total", format_total(order.total_amount));

        let mut block = vec![i18n::t_args(lang, "order-summary", &args)];
        for item in &entry.items {
            let mut args = FluentArgs::new();
            args.set("name", item.display_name());
            args.set("quantity", item.quantity);
            block.push(i18n::t_args(lang, "order-item", &args));
        }
        let payment_key = if order.payment_confirmed {
            "order-payment-confirmed"
        } else {
            "order-payment-pending"
        };
        block.push(i18n::t(lang, payment_key));
        blocks.push(block.join("\n"));
    }
    blocks.join("\n\n")
}

pub async fn show_orders(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps, lang: &LanguageIdentifier) -> AppResult<()> {
    let history = {
        let conn = get_connection(&deps.db_pool)?;
        orders::get_orders_with_items(&conn, chat_id.0, HISTORY_LIMIT)?
    };
    bot.send_message(chat_id, history_text(lang, &history)).await?;
    Ok(())
}
