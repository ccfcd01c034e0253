//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{ChatMemberUpdated, Message};

use super::commands::handle_command;
use super::messages::{handle_channel_member, handle_photo, handle_text, handle_unsupported};
use super::types::{register_user, report_error, telegram_id, HandlerDeps, HandlerError};
use crate::telegram::bot::Command;
use crate::telegram::menu::handle_callback;
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the bot.
///
/// Every sender is registered before routing. Endpoints report their own
/// errors to the user, so the dispatcher only sees handler panics.
///
/// # Arguments
/// * `deps` - Handler dependencies (database pool, checkout and shop flows)
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_register = deps.clone();
    let deps_channel = deps.clone();
    let deps_commands = deps.clone();
    let deps_photos = deps.clone();
    let deps_text = deps.clone();
    let deps_other = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .inspect(move |update: Update| {
            if let Some(user) = update.from() {
                register_user(&deps_register.db_pool, user);
            }
        })
        // Channel joins and leaves feed the membership stats
        .branch(channel_member_handler(deps_channel))
        .branch(command_handler(deps_commands))
        // Payment proof photos
        .branch(photo_handler(deps_photos))
        // Menu buttons, product answers and checkout input
        .branch(text_handler(deps_text))
        // Documents, stickers and other media
        .branch(unsupported_message_handler(deps_other))
        .branch(callback_handler(deps_callback))
}

fn channel_member_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let channel_id = deps.channel_id;

    Update::filter_chat_member()
        .filter(move |update: ChatMemberUpdated| channel_id == Some(update.chat.id.0))
        .endpoint(move |update: ChatMemberUpdated| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_channel_member(&deps, &update) {
                    log::error!("Failed to record membership change in chat {}: {}", update.chat.id.0, e);
                }
                Ok(())
            }
        })
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .branch(dptree::entry().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let deps = deps.clone();
                async move {
                    log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);

                    if let Err(e) = handle_command(&bot, &msg, &deps, cmd).await {
                        report_error(&bot, &deps.db_pool, msg.chat.id, "command", e).await;
                    }
                    Ok(())
                }
            },
        ))
}

fn photo_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private() && msg.photo().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_photo(&bot, &msg, &deps).await {
                    report_error(&bot, &deps.db_pool, msg.chat.id, "photo", e).await;
                }
                Ok(())
            }
        })
}

fn text_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .filter_map(|msg: Message| msg.text().map(str::to_owned))
        .endpoint(move |bot: Bot, msg: Message, text: String| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_text(&bot, &msg, &deps, &text).await {
                    report_error(&bot, &deps.db_pool, msg.chat.id, "message", e).await;
                }
                Ok(())
            }
        })
}

fn unsupported_message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_unsupported(&bot, &msg, &deps).await {
                    report_error(&bot, &deps.db_pool, msg.chat.id, "message", e).await;
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_callback(&bot, &q, &deps).await {
                let chat_id = q
                    .message
                    .as_ref()
                    .map(|m| m.chat().id)
                    .unwrap_or(ChatId(telegram_id(&q.from)));
                report_error(&bot, &deps.db_pool, chat_id, "callback", e).await;
            }
            Ok(())
        }
    })
}
