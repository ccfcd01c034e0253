use teloxide::prelude::*;
use teloxide::types::MessageId;
use unic_langid::LanguageIdentifier;

use super::{cart, catalog, orders, promo};
use super::{show_about, show_main_menu, show_stats, toggle_consent};
use crate::checkout::CheckoutReply;
use crate::core::error::AppResult;
use crate::i18n;
use crate::telegram::callback::CallbackAction;
use crate::telegram::checkout_ui;
use crate::telegram::handlers::{telegram_id, HandlerDeps};
use crate::telegram::Bot;

/// Handles callback queries from the inline keyboards.
///
/// The query is answered first so the client stops the spinner; unknown payloads
/// (for example buttons of an older bot version) are acknowledged and dropped.
pub async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> AppResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = CallbackAction::parse(data) else {
        log::warn!("Unknown callback data from user {}: {}", q.from.id.0, data);
        return Ok(());
    };

    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(telegram_id(&q.from)));
    let message_id: Option<MessageId> = q.message.as_ref().map(|m| m.id());
    let lang = i18n::user_lang_from_pool(&deps.db_pool, chat_id.0);
    let user = chat_id.0;

    log::debug!("Callback {:?} from user {}", action, user);

    match action {
        CallbackAction::MainMenu => show_main_menu(bot, chat_id, &lang, None).await?,
        CallbackAction::Shop => catalog::show_catalog(bot, chat_id, deps, &lang).await?,
        CallbackAction::Product(product_id) => catalog::show_product(bot, chat_id, deps, &lang, product_id).await?,
        CallbackAction::Add {
            product_id,
            variant_id,
            gender,
        } => catalog::handle_add(bot, chat_id, deps, &lang, product_id, variant_id, gender).await?,
        CallbackAction::Cart => cart::show_cart(bot, chat_id, deps, &lang, None).await?,
        CallbackAction::RemoveLine(line_id) => cart::remove_line(bot, chat_id, deps, &lang, line_id, message_id).await?,
        CallbackAction::ClearCart => cart::clear(bot, chat_id, deps, &lang, message_id).await?,
        CallbackAction::StartCheckout => {
            deps.shop.abort(user).await;
            let reply = deps.checkout.start(user).await;
            checkout_ui::deliver(bot, chat_id, deps, &lang, reply).await?;
        }
        CallbackAction::ChooseCity(choice) => {
            let reply = deps.checkout.choose_city(user, choice).await;
            finish_choice(bot, chat_id, message_id, deps, &lang, reply).await?;
        }
        CallbackAction::ChoosePickup(choice) => {
            let reply = deps.checkout.choose_pickup_point(user, choice).await;
            finish_choice(bot, chat_id, message_id, deps, &lang, reply).await?;
        }
        CallbackAction::NoComment => {
            let reply = deps.checkout.skip_comment(user).await;
            finish_choice(bot, chat_id, message_id, deps, &lang, reply).await?;
        }
        CallbackAction::CancelCheckout => {
            let reply = deps.checkout.cancel(user).await;
            finish_choice(bot, chat_id, message_id, deps, &lang, reply).await?;
        }
        CallbackAction::Promos => promo::show_promos(bot, chat_id, deps, &lang).await?,
        CallbackAction::Promo(promo_id) => promo::show_promo(bot, chat_id, deps, &lang, promo_id).await?,
        CallbackAction::Orders => orders::show_orders(bot, chat_id, deps, &lang).await?,
        CallbackAction::About => show_about(bot, chat_id, &lang).await?,
        CallbackAction::Stats => show_stats(bot, chat_id, deps, &lang).await?,
        CallbackAction::ToggleConsent => toggle_consent(bot, chat_id, deps, &lang).await?,
        CallbackAction::Noop => {}
    }
    Ok(())
}

/// Delivers a checkout step reply and strips the keyboard it was chosen from.
/// Stale buttons of a finished or foreign step are ignored silently.
async fn finish_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
    deps: &HandlerDeps,
    lang: &LanguageIdentifier,
    reply: CheckoutReply,
) -> AppResult<()> {
    if !checkout_ui::deliver(bot, chat_id, deps, lang, reply).await? {
        return Ok(());
    }
    if let Some(message_id) = message_id {
        if let Err(e) = bot.edit_message_reply_markup(chat_id, message_id).await {
            log::debug!("Keyboard of message {} not removed: {}", message_id.0, e);
        }
    }
    Ok(())
}
