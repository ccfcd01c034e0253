use fluent_templates::fluent_bundle::FluentArgs;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use unic_langid::LanguageIdentifier;
use url::Url;

use crate::core::error::AppResult;
use crate::i18n;
use crate::storage::get_connection;
use crate::storage::promo::{self, PromoCode};
use crate::telegram::callback::CallbackAction;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::{cb, Bot};

pub async fn show_promos(bot: &Bot, chat_id: ChatId, deps: &HandlerDeps, lang: &LanguageIdentifier) -> AppResult<()> {
    let codes = {
        let conn = get_connection(&deps.db_pool)?;
        promo::get_active_promo_codes(&conn)?
    };

    if codes.is_empty() {
        bot.send_message(chat_id, i18n::t(lang, "promos-empty")).await?;
        return Ok(());
    }

    let rows: Vec<Vec<InlineKeyboardButton>> = codes
        .iter()
        .map(|code| vec![cb(format!("🎁 {}", code.partner_name), CallbackAction::Promo(code.id))])
        .collect();
    bot.send_message(chat_id, i18n::t(lang, "promos-title"))
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

pub fn promo_details(lang: &LanguageIdentifier, code: &PromoCode) -> String {
    let mut args = FluentArgs::new();
    args.set("partner", code.partner_name.clone());
    args.set("description", code.description.clone());
    args.set("code", code.code.clone());
    let mut text = i18n::t_args(lang, "promo-details", &args);

    if let Some(dates) = code.formatted_dates() {
        let mut args = FluentArgs::new();
        args.set("dates", dates);
        text.push_str("\n\n");
        text.push_str(&i18n::t_args(lang, "promo-valid", &args));
    }
    text
}

pub async fn show_promo(
    bot: &Bot,
    chat_id: ChatId,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    promo_id: i64,
) -> AppResult<()> {
    let code = {
        let conn = get_connection(&deps.db_pool)?;
        promo::get_promo_code_by_id(&conn, promo_id)?
    };
    let Some(code) = code.filter(|c| c.status == "active") else {
        return show_promos(bot, chat_id, deps, lang).await;
    };

    let mut rows = Vec::new();
    if let Some(url) = code.link.as_deref().and_then(|raw| Url::parse(raw).ok()) {
        rows.push(vec![InlineKeyboardButton::url(i18n::t(lang, "promo-link"), url)]);
    }
    rows.push(vec![cb(i18n::t(lang, "menu-back"), CallbackAction::Promos)]);

    bot.send_message(chat_id, promo_details(lang, &code))
        .reply_markup(InlineKeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use unic_langid::langid;

    #[test]
    fn test_promo_details_with_window() {
        let code = PromoCode {
            id: 1,
            partner_name: "VeloShop".to_string(),
            description: "15% off".to_string(),
            code: "FAT15".to_string(),
            link: None,
            start_date: Some("2026-01-05".to_string()),
            end_date: Some("2026-12-31".to_string()),
            status: "active".to_string(),
        };
        let text = promo_details(&langid!("en"), &code);
        assert!(text.contains("Promo code: FAT15"));
        assert!(text.contains("Valid: 05.01.2026 – 31.12.2026"));
    }
}
