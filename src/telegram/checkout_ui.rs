//! Rendering of checkout replies into messages and inline keyboards

use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, PhotoSize};
use unic_langid::LanguageIdentifier;

use crate::checkout::{CheckoutReply, Contact};
use crate::core::config;
use crate::core::error::AppResult;
use crate::core::types::format_total;
use crate::i18n;
use crate::telegram::callback::CallbackAction;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::{cb, notifications, Bot};

const PHOTO_PREFIX: &str = "tg-file:";

/// One or two messages produced by a checkout reply
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyView {
    /// Sent before the main text, e.g. the reused contact summary
    pub preface: Option<String>,
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl ReplyView {
    fn text(text: String) -> Self {
        Self {
            preface: None,
            text,
            keyboard: None,
        }
    }

    fn with_keyboard(mut self, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        self.keyboard = Some(InlineKeyboardMarkup::new(rows));
        self
    }
}

fn cancel_row(lang: &LanguageIdentifier) -> Vec<InlineKeyboardButton> {
    vec![cb(i18n::t(lang, "checkout-cancel"), CallbackAction::CancelCheckout)]
}

fn reused_summary(lang: &LanguageIdentifier, contact: &Contact) -> String {
    let mut args = FluentArgs::new();
    args.set("name", contact.name.clone());
    args.set("phone", contact.phone.clone().unwrap_or_else(|| "-".to_string()));
    args.set(
        "address",
        contact.pickup_label.clone().unwrap_or_else(|| contact.city.clone()),
    );
    i18n::t_args(lang, "checkout-reused", &args)
}

fn payment_text(lang: &LanguageIdentifier, total: rust_decimal::Decimal) -> String {
    let mut args = FluentArgs::new();
    args.set("total", format_total(total));
    args.set("phone", config::payment::PAYMENT_PHONE.clone());
    args.set(
        "bank",
        config::payment::PAYMENT_BANK
            .as_deref()
            .map(|bank| format!(" ({})", bank))
            .unwrap_or_default(),
    );
    i18n::t_args(lang, "checkout-payment", &args)
}

/// Message layout for a reply; `None` for [`CheckoutReply::Ignored`]
pub fn reply_view(lang: &LanguageIdentifier, reply: &CheckoutReply) -> Option<ReplyView> {
    let view = match reply {
        CheckoutReply::AskName => ReplyView::text(i18n::t(lang, "checkout-ask-name")),
        CheckoutReply::AskPhone => ReplyView::text(i18n::t(lang, "checkout-ask-phone")),
        CheckoutReply::AskPickupAddress => ReplyView::text(i18n::t(lang, "checkout-ask-pickup-address")),
        CheckoutReply::AskCity => ReplyView::text(i18n::t(lang, "checkout-ask-city")),
        CheckoutReply::ChooseCity { typed, options } => {
            let mut args = FluentArgs::new();
            args.set("typed", typed.clone());
            let mut rows: Vec<Vec<InlineKeyboardButton>> = options
                .iter()
                .enumerate()
                .map(|(idx, label)| vec![cb(label.clone(), CallbackAction::ChooseCity(Some(idx)))])
                .collect();
            rows.push(vec![cb(i18n::t(lang, "checkout-keep-city"), CallbackAction::ChooseCity(None))]);
            ReplyView::text(i18n::t_args(lang, "checkout-choose-city", &args)).with_keyboard(rows)
        }
        CheckoutReply::AskStreet { city } => {
            let mut args = FluentArgs::new();
            args.set("city", city.clone());
            ReplyView::text(i18n::t_args(lang, "checkout-ask-street", &args))
        }
        CheckoutReply::ChoosePickupPoint { options } => {
            let mut rows: Vec<Vec<InlineKeyboardButton>> = options
                .iter()
                .enumerate()
                .map(|(idx, label)| vec![cb(label.clone(), CallbackAction::ChoosePickup(Some(idx)))])
                .collect();
            rows.push(vec![cb(i18n::t(lang, "checkout-skip-pickup"), CallbackAction::ChoosePickup(None))]);
            ReplyView::text(i18n::t(lang, "checkout-choose-pickup")).with_keyboard(rows)
        }
        CheckoutReply::NoPickupPoints { city } => {
            let mut args = FluentArgs::new();
            args.set("city", city.clone());
            ReplyView::text(i18n::t_args(lang, "checkout-no-pickup-points", &args)).with_keyboard(vec![vec![cb(
                i18n::t(lang, "checkout-skip-pickup"),
                CallbackAction::ChoosePickup(None),
            )]])
        }
        CheckoutReply::AskComment { reused } => {
            let mut view = ReplyView::text(i18n::t(lang, "checkout-ask-comment")).with_keyboard(vec![
                vec![cb(i18n::t(lang, "checkout-no-comment"), CallbackAction::NoComment)],
                cancel_row(lang),
            ]);
            view.preface = reused.as_ref().map(|contact| reused_summary(lang, contact));
            view
        }
        CheckoutReply::PaymentInstructions { total } => {
            ReplyView::text(payment_text(lang, *total)).with_keyboard(vec![cancel_row(lang)])
        }
        CheckoutReply::PhotoRequired => {
            ReplyView::text(i18n::t(lang, "checkout-photo-required")).with_keyboard(vec![cancel_row(lang)])
        }
        CheckoutReply::OrderCreated { order_id, total } => {
            let mut args = FluentArgs::new();
            args.set("id", *order_id);
            args.set("total", format_total(*total));
            ReplyView::text(i18n::t_args(lang, "checkout-order-created", &args))
        }
        CheckoutReply::CartEmpty => ReplyView::text(i18n::t(lang, "checkout-cart-empty")),
        CheckoutReply::Cancelled => ReplyView::text(i18n::t(lang, "checkout-cancelled")),
        CheckoutReply::Failed => ReplyView::text(i18n::t(lang, "checkout-failed")),
        CheckoutReply::Ignored => return None,
    };
    Some(view)
}

/// Sends a checkout reply; a created order is also forwarded to the admins.
/// Returns false for [`CheckoutReply::Ignored`] so callers can route the update elsewhere.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    reply: CheckoutReply,
) -> AppResult<bool> {
    let Some(view) = reply_view(lang, &reply) else {
        return Ok(false);
    };

    if let Some(preface) = view.preface {
        bot.send_message(chat_id, preface).await?;
    }
    let request = bot.send_message(chat_id, view.text);
    match view.keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };

    if let CheckoutReply::OrderCreated { order_id, .. } = reply {
        let bot = bot.clone();
        let db_pool = deps.db_pool.clone();
        tokio::spawn(async move {
            notifications::notify_admins_new_order(&bot, &db_pool, order_id).await;
        });
    }
    Ok(true)
}

/// Stored reference (`tg-file:<id>`) of the largest photo size, used for payment proofs and broadcasts
pub fn photo_reference(sizes: &[PhotoSize]) -> Option<String> {
    sizes
        .iter()
        .max_by_key(|size| u64::from(size.width) * u64::from(size.height))
        .map(|size| format!("{}{}", PHOTO_PREFIX, size.file.id.0))
}

/// Telegram file id behind a stored photo reference
pub fn photo_file_id(reference: &str) -> Option<&str> {
    reference.strip_prefix(PHOTO_PREFIX).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use unic_langid::langid;

    fn buttons(view: &ReplyView) -> Vec<String> {
        view.keyboard
            .as_ref()
            .map(|k| k.inline_keyboard.iter().flatten().map(|b| b.text.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_city_choice_offers_keep_as_typed() {
        let lang = langid!("en");
        let reply = CheckoutReply::ChooseCity {
            typed: "Moskva".to_string(),
            options: vec!["Moscow".to_string(), "Moscow Oblast".to_string()],
        };
        let view = reply_view(&lang, &reply).unwrap();
        assert!(view.text.contains("\"Moskva\""));
        assert_eq!(buttons(&view), vec!["Moscow", "Moscow Oblast", "✍️ Keep as typed"]);
    }

    #[test]
    fn test_pickup_choice_offers_skip() {
        let lang = langid!("en");
        let view = reply_view(
            &lang,
            &CheckoutReply::ChoosePickupPoint {
                options: vec!["PVZ 1".to_string()],
            },
        )
        .unwrap();
        assert_eq!(buttons(&view), vec!["PVZ 1", "⏭ No pickup point"]);
    }

    #[test]
    fn test_reused_contact_preface() {
        let lang = langid!("en");
        let contact = Contact {
            name: "Ivan".to_string(),
            phone: Some("+79990000000".to_string()),
            city: "Moscow".to_string(),
            pickup_label: Some("Moscow, Tverskaya 1".to_string()),
            ..Default::default()
        };
        let view = reply_view(&lang, &CheckoutReply::AskComment { reused: Some(contact) }).unwrap();
        let preface = view.preface.clone().unwrap();
        assert!(preface.contains("Ivan"));
        assert!(preface.contains("Moscow, Tverskaya 1"));
        assert_eq!(buttons(&view), vec!["No comment", "❌ Cancel checkout"]);
    }

    #[test]
    fn test_payment_and_order_texts() {
        let lang = langid!("en");
        let payment = reply_view(
            &lang,
            &CheckoutReply::PaymentInstructions {
                total: Decimal::new(2200, 0),
            },
        )
        .unwrap();
        assert!(payment.text.contains("2200 RUB"));
        assert!(payment.text.contains(config::payment::PAYMENT_PHONE.as_str()));

        let created = reply_view(
            &lang,
            &CheckoutReply::OrderCreated {
                order_id: 17,
                total: Decimal::new(2200, 0),
            },
        )
        .unwrap();
        assert!(created.text.contains("#17"));
        assert!(created.keyboard.is_none());

        assert!(reply_view(&lang, &CheckoutReply::Ignored).is_none());
    }

    #[test]
    fn test_photo_file_id() {
        assert_eq!(photo_file_id("tg-file:AgACAgI"), Some("AgACAgI"));
        assert_eq!(photo_file_id("tg-file:"), None);
        assert_eq!(photo_file_id("https://example.com/p.jpg"), None);
    }
}
