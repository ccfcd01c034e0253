use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use unic_langid::LanguageIdentifier;
use url::Url;

use crate::core::error::AppResult;
use crate::core::types::Gender;
use crate::i18n;
use crate::shop::{AddOutcome, AnswerOutcome};
use crate::storage::catalog::{self, Product, ProductVariant};
use crate::storage::{get_connection, promo};
use crate::telegram::callback::CallbackAction;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::{cb, Bot};

/// Catalog list, one button per active product
pub async fn show_catalog(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps, lang: &LanguageIdentifier) -> AppResult<()> {
    let products = {
        let conn = get_connection(&deps.db_pool)?;
        catalog::get_active_products(&conn)?
    };

    if products.is_empty() {
        bot.send_message(chat_id, i18n::t(lang, "shop-empty")).await?;
        return Ok(());
    }

    let rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|p| {
            let label = format!("{} · {}", p.name, p.formatted_price());
            vec![cb(label, CallbackAction::Product(p.id))]
        })
        .collect();

    bot.send_message(chat_id, i18n::t(lang, "shop-title"))
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

/// Card text: description, price, then either the preorder note or the stock line
pub fn product_caption(lang: &LanguageIdentifier, product: &Product, has_variants: bool) -> String {
    let mut lines = vec![product.name.clone()];
    if !product.description.trim().is_empty() {
        lines.push(String::new());
        lines.push(product.description.trim().to_string());
    }
    lines.push(String::new());

    let mut args = FluentArgs::new();
    args.set("price", product.formatted_price());
    lines.push(i18n::t_args(lang, "product-price", &args));

    if product.is_preorder {
        let until = product.preorder_end_date.as_deref().and_then(promo::format_date);
        lines.push(match until {
            Some(date) => {
                let mut args = FluentArgs::new();
                args.set("date", date);
                i18n::t_args(lang, "product-preorder-until", &args)
            }
            None => i18n::t(lang, "product-preorder"),
        });
    } else if product.stock > 0 {
        let mut args = FluentArgs::new();
        args.set("stock", product.stock);
        lines.push(i18n::t_args(lang, "product-stock", &args));
    } else {
        lines.push(i18n::t(lang, "product-out-of-stock"));
    }

    if let Some(date) = product.estimated_delivery_date.as_deref().and_then(promo::format_date) {
        let mut args = FluentArgs::new();
        args.set("date", date);
        lines.push(i18n::t_args(lang, "product-eta", &args));
    }

    if has_variants {
        lines.push(String::new());
        lines.push(i18n::t(lang, "product-choose-variant"));
    }
    lines.join("\n")
}

pub fn product_keyboard(lang: &LanguageIdentifier, product: &Product, variants: &[ProductVariant]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    if variants.is_empty() {
        if product.is_available() {
            rows.push(vec![cb(
                i18n::t(lang, "product-add"),
                CallbackAction::Add {
                    product_id: product.id,
                    variant_id: None,
                    gender: None,
                },
            )]);
        }
    } else {
        for variant in variants {
            let action = if variant.is_available() || product.is_preorder {
                CallbackAction::Add {
                    product_id: product.id,
                    variant_id: Some(variant.id),
                    gender: None,
                }
            } else {
                CallbackAction::Noop
            };
            let label = if matches!(action, CallbackAction::Noop) {
                format!("{} ✖", variant.name)
            } else {
                variant.name.clone()
            };
            rows.push(vec![cb(label, action)]);
        }
    }

    if let Some(url) = product.size_guide_url.as_deref().and_then(|raw| Url::parse(raw).ok()) {
        rows.push(vec![InlineKeyboardButton::url(i18n::t(lang, "product-size-guide"), url)]);
    }
    rows.push(vec![cb(i18n::t(lang, "menu-back"), CallbackAction::Shop)]);
    InlineKeyboardMarkup::new(rows)
}

/// Product card with photo when one is configured
pub async fn show_product(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    product_id: i64,
) -> AppResult<()> {
    let loaded = {
        let conn = get_connection(&deps.db_pool)?;
        match catalog::get_product_by_id(&conn, product_id)? {
            Some(product) if product.status == "active" => {
                let variants = catalog::get_product_variants(&conn, product_id)?;
                let images = catalog::get_product_images(&conn, product_id)?;
                Some((product, variants, images))
            }
            _ => None,
        }
    };
    let Some((product, variants, images)) = loaded else {
        bot.send_message(chat_id, i18n::t(lang, "product-not-found")).await?;
        return Ok(());
    };

    let caption = product_caption(lang, &product, !variants.is_empty());
    let keyboard = product_keyboard(lang, &product, &variants);

    let photo = product
        .photo_url
        .clone()
        .or_else(|| images.first().map(|img| img.url.clone()))
        .and_then(|raw| Url::parse(&raw).ok());

    match photo {
        Some(url) => {
            bot.send_photo(chat_id, InputFile::url(url))
                .caption(caption)
                .reply_markup(keyboard)
                .await?;
        }
        None => {
            bot.send_message(chat_id, caption).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}

fn gender_keyboard(lang: &LanguageIdentifier, product_id: i64, variant_id: Option<i64>) -> InlineKeyboardMarkup {
    let button = |key: &str, gender: Gender| {
        cb(
            i18n::t(lang, key),
            CallbackAction::Add {
                product_id,
                variant_id,
                gender: Some(gender),
            },
        )
    };
    InlineKeyboardMarkup::new(vec![vec![
        button("gender-male", Gender::Male),
        button("gender-female", Gender::Female),
    ]])
}

fn go_to_cart_keyboard(lang: &LanguageIdentifier) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![cb(i18n::t(lang, "menu-open-cart"), CallbackAction::Cart)],
        vec![cb(i18n::t(lang, "menu-back"), CallbackAction::Shop)],
    ])
}

fn question_text(lang: &LanguageIdentifier, question: &str, number: usize, total: usize) -> String {
    let mut args = FluentArgs::new();
    args.set("question", question.to_string());
    args.set("number", number);
    args.set("total", total);
    i18n::t_args(lang, "question-ask", &args)
}

async fn confirm_added(bot: &Bot, chat_id: ChatId, lang: &LanguageIdentifier, product_name: &str) -> AppResult<()> {
    let mut args = FluentArgs::new();
    args.set("product", product_name.to_string());
    bot.send_message(chat_id, i18n::t_args(lang, "cart-added", &args))
        .reply_markup(go_to_cart_keyboard(lang))
        .await?;
    Ok(())
}

/// Runs an add-to-cart tap through the shop flow and shows what comes next
pub async fn handle_add(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    product_id: i64,
    variant_id: Option<i64>,
    gender: Option<Gender>,
) -> AppResult<()> {
    match deps.shop.add(chat_id.0, product_id, variant_id, gender).await? {
        AddOutcome::Added { product_name, .. } => confirm_added(bot, chat_id, lang, &product_name).await?,
        AddOutcome::NeedGender { product_id, variant_id } => {
            bot.send_message(chat_id, i18n::t(lang, "gender-choose"))
                .reply_markup(gender_keyboard(lang, product_id, variant_id))
                .await?;
        }
        AddOutcome::NeedVariant { product_id } => show_product(bot, chat_id, deps, lang, product_id).await?,
        AddOutcome::AskQuestion { question, number, total } => {
            bot.send_message(chat_id, question_text(lang, &question, number, total))
                .await?;
        }
        AddOutcome::ProductUnavailable => {
            bot.send_message(chat_id, i18n::t(lang, "product-not-found")).await?;
        }
    }
    Ok(())
}

/// Routes a text message to a running question flow; false when none is running
pub async fn handle_answer(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    text: &str,
) -> AppResult<bool> {
    match deps.shop.answer(chat_id.0, text).await? {
        AnswerOutcome::NotActive => return Ok(false),
        AnswerOutcome::Next { question, number, total } => {
            bot.send_message(chat_id, question_text(lang, &question, number, total))
                .await?;
        }
        AnswerOutcome::Added { product_name, .. } => confirm_added(bot, chat_id, lang, &product_name).await?,
    }
    Ok(true)
}
