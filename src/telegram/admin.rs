//! Admin commands: order overview, payment confirmation, status changes, broadcasts

use std::str::FromStr;

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use unic_langid::LanguageIdentifier;

use crate::core::config::admin::is_admin;
use crate::core::error::{AppError, AppResult};
use crate::core::types::{format_total, OrderStatus};
use crate::i18n;
use crate::storage::broadcasts::{self, BroadcastTarget};
use crate::storage::orders::{self, Order};
use crate::storage::{get_connection, users, DbPool};
use crate::telegram::bot::Command;
use crate::telegram::broadcast::run_broadcast;
use crate::telegram::checkout_ui::photo_reference;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::menu::status_label;
use crate::telegram::{notifications, Bot};

const ADMIN_ORDERS_LIMIT: usize = 20;

pub fn parse_order_id(args: &str) -> Option<i64> {
    args.trim().trim_start_matches('#').parse().ok().filter(|id| *id > 0)
}

/// `12 completed` into an order id and a status
pub fn parse_status_args(args: &str) -> Option<(i64, OrderStatus)> {
    let mut parts = args.split_whitespace();
    let id = parse_order_id(parts.next()?)?;
    let status = OrderStatus::from_str(&parts.next()?.to_lowercase()).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((id, status))
}

/// `all <text>` targets every active user, plain `<text>` only the consenting ones
pub fn parse_broadcast_args(args: &str) -> Option<(BroadcastTarget, String)> {
    let args = args.trim();
    let (target, text) = match args.split_once(char::is_whitespace) {
        Some(("all", rest)) => (BroadcastTarget::All, rest.trim()),
        _ if args == "all" => return None,
        _ => (BroadcastTarget::Consent, args),
    };
    if text.is_empty() {
        None
    } else {
        Some((target, text.to_string()))
    }
}

fn order_row(lang: &LanguageIdentifier, order: &Order) -> String {
    let mut args = FluentArgs::new();
    args.set("id", order.id);
    args.set("status", format!("{} {}", order.status.emoji(), status_label(lang, order.status)));
    args.set("total", format_total(order.total_amount));
    args.set("name", order.customer_name.clone().unwrap_or_else(|| "-".to_string()));
    args.set("paid", if order.payment_confirmed { "✅" } else { "⏳" });
    i18n::t_args(lang, "admin-order-row", &args)
}

fn with_id(lang: &LanguageIdentifier, key: &str, id: i64) -> String {
    let mut args = FluentArgs::new();
    args.set("id", id);
    i18n::t_args(lang, key, &args)
}

/// Entry point for every admin-only command
pub async fn handle_admin_command(bot: &Bot, msg: &Message, deps: &HandlerDeps, cmd: Command) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let lang = i18n::user_lang_from_pool(&deps.db_pool, chat_id.0);
    let user_id = msg
        .from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(0);

    if !is_admin(user_id) {
        log::warn!("Non-admin user {} tried {:?}", user_id, cmd);
        bot.send_message(chat_id, i18n::t(&lang, "admin-only")).await?;
        return Ok(());
    }

    match cmd {
        Command::AdminOrders => list_orders(bot, chat_id, &deps.db_pool, &lang).await,
        Command::Confirm(args) => set_payment(bot, chat_id, &deps.db_pool, &lang, &args, true).await,
        Command::Unconfirm(args) => set_payment(bot, chat_id, &deps.db_pool, &lang, &args, false).await,
        Command::Status(args) => set_status(bot, chat_id, &deps.db_pool, &lang, &args).await,
        Command::Broadcast(args) => {
            let photo = msg
                .reply_to_message()
                .and_then(|m| m.photo())
                .and_then(photo_reference);
            start_broadcast(bot, chat_id, &deps.db_pool, &lang, &args, photo).await
        }
        other => Err(AppError::Validation(format!("{:?} is not an admin command", other))),
    }
}

async fn list_orders(bot: &Bot, chat_id: ChatId, db_pool: &DbPool, lang: &LanguageIdentifier) -> AppResult<()> {
    let recent = {
        let conn = get_connection(db_pool)?;
        orders::list_recent_orders(&conn, ADMIN_ORDERS_LIMIT)?
    };
    let text = if recent.is_empty() {
        i18n::t(lang, "admin-orders-empty")
    } else {
        recent.iter().map(|o| order_row(lang, o)).collect::<Vec<_>>().join("\n")
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Customer notices are best effort: an unreachable customer is marked blocked
fn notify_customer(db_pool: &DbPool, order: &Order, result: AppResult<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_delivery_failure() => {
            log::warn!("Customer {} of order #{} is unreachable", order.telegram_id, order.id);
            if let Ok(conn) = get_connection(db_pool) {
                if let Err(e) = users::mark_user_blocked(&conn, order.telegram_id) {
                    log::error!("Failed to mark user {} blocked: {}", order.telegram_id, e);
                }
            }
        }
        Err(e) => log::error!("Failed to notify customer about order #{}: {}", order.id, e),
    }
}

async fn set_payment(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: &DbPool,
    lang: &LanguageIdentifier,
    args: &str,
    confirmed: bool,
) -> AppResult<()> {
    let Some(order_id) = parse_order_id(args) else {
        bot.send_message(chat_id, i18n::t(lang, "admin-usage-order-id")).await?;
        return Ok(());
    };

    let order = {
        let conn = get_connection(db_pool)?;
        if orders::set_payment_confirmed(&conn, order_id, confirmed)? {
            orders::get_order_by_id(&conn, order_id)?
        } else {
            None
        }
    };
    let Some(order) = order else {
        bot.send_message(chat_id, with_id(lang, "admin-order-not-found", order_id))
            .await?;
        return Ok(());
    };

    log::info!("💳 Order #{} payment confirmed: {} (admin {})", order_id, confirmed, chat_id.0);
    let key = if confirmed { "admin-confirmed" } else { "admin-unconfirmed" };
    bot.send_message(chat_id, with_id(lang, key, order_id)).await?;

    if confirmed {
        let result = notifications::notify_payment_confirmed(bot, db_pool, &order).await;
        notify_customer(db_pool, &order, result);
    }
    Ok(())
}

async fn set_status(bot: &Bot, chat_id: ChatId, db_pool: &DbPool, lang: &LanguageIdentifier, args: &str) -> AppResult<()> {
    let Some((order_id, status)) = parse_status_args(args) else {
        bot.send_message(chat_id, i18n::t(lang, "admin-usage-status")).await?;
        return Ok(());
    };

    let order = {
        let conn = get_connection(db_pool)?;
        if orders::update_order_status(&conn, order_id, status)? {
            orders::get_order_by_id(&conn, order_id)?
        } else {
            None
        }
    };
    let Some(order) = order else {
        bot.send_message(chat_id, with_id(lang, "admin-order-not-found", order_id))
            .await?;
        return Ok(());
    };

    log::info!("📦 Order #{} status set to {} (admin {})", order_id, status, chat_id.0);
    let mut args = FluentArgs::new();
    args.set("id", order_id);
    args.set("status", status_label(lang, status));
    bot.send_message(chat_id, i18n::t_args(lang, "admin-status-updated", &args))
        .await?;

    let result = notifications::notify_status_changed(bot, db_pool, &order, status).await;
    notify_customer(db_pool, &order, result);
    Ok(())
}

async fn start_broadcast(
    bot: &Bot,
    chat_id: ChatId,
    db_pool: &DbPool,
    lang: &LanguageIdentifier,
    args: &str,
    photo: Option<String>,
) -> AppResult<()> {
    let Some((target, text)) = parse_broadcast_args(args) else {
        bot.send_message(chat_id, i18n::t(lang, "admin-usage-broadcast")).await?;
        return Ok(());
    };

    let broadcast_id = {
        let conn = get_connection(db_pool)?;
        broadcasts::create_broadcast(&conn, &text, photo.as_deref(), target)?
    };
    bot.send_message(chat_id, with_id(lang, "broadcast-started", broadcast_id))
        .await?;

    // the admin is answered right away, the run itself can take minutes
    let bot = bot.clone();
    let db_pool = db_pool.clone();
    let lang = lang.clone();
    tokio::spawn(async move {
        match run_broadcast(&bot, &db_pool, broadcast_id).await {
            Ok(report) => {
                let mut args = FluentArgs::new();
                args.set("id", broadcast_id);
                args.set("sent", report.sent);
                args.set("failed", report.failed);
                if let Err(e) = bot
                    .send_message(chat_id, i18n::t_args(&lang, "broadcast-done", &args))
                    .await
                {
                    log::error!("Failed to report broadcast #{} to admin: {}", broadcast_id, e);
                }
            }
            Err(e) => log::error!("Broadcast #{} failed: {}", broadcast_id, e),
        }
    });
    Ok(())
}
