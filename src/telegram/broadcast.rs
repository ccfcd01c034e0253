//! Mass messaging to the user registry

use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile};
use teloxide::RequestError;
use tokio::time::sleep;
use url::Url;

use crate::core::config;
use crate::core::error::{is_blocked_by_user, AppError, AppResult};
use crate::storage::broadcasts::{self, BroadcastTarget};
use crate::storage::{get_connection, users, DbPool};
use crate::telegram::checkout_ui::photo_file_id;
use crate::telegram::Bot;

/// Delivery counters of one broadcast run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Telegram ids that receive a broadcast of the given target
pub fn recipients(db_pool: &DbPool, target: BroadcastTarget) -> AppResult<Vec<i64>> {
    let conn = get_connection(db_pool)?;
    let users = match target {
        BroadcastTarget::Consent => users::get_users_with_broadcast_consent(&conn)?,
        BroadcastTarget::All => users::get_active_users(&conn)?,
    };
    Ok(users.into_iter().map(|u| u.telegram_id).collect())
}

/// Sends to every recipient with a pause in between.
///
/// A failed send never stops the loop; users that blocked the bot are marked blocked.
pub async fn deliver_all<F, Fut>(db_pool: &DbPool, recipients: &[i64], send: F) -> BroadcastReport
where
    F: Fn(ChatId) -> Fut,
    Fut: Future<Output = Result<(), RequestError>>,
{
    let mut report = BroadcastReport::default();

    for &telegram_id in recipients {
        match send(ChatId(telegram_id)).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                if is_blocked_by_user(&e) {
                    log::info!("User {} blocked the bot, marking unreachable", telegram_id);
                    match get_connection(db_pool) {
                        Ok(conn) => {
                            if let Err(e) = users::mark_user_blocked(&conn, telegram_id) {
                                log::error!("Failed to mark user {} blocked: {}", telegram_id, e);
                            }
                        }
                        Err(e) => log::error!("Failed to get DB connection for user {}: {}", telegram_id, e),
                    }
                } else {
                    log::warn!("Broadcast message to {} failed: {}", telegram_id, e);
                }
            }
        }
        sleep(config::broadcast::send_delay()).await;
    }

    report
}

enum Attachment {
    None,
    File(String),
    Url(Url),
}

impl Attachment {
    fn from_stored(photo: Option<&str>) -> Self {
        match photo {
            None => Attachment::None,
            Some(reference) => match photo_file_id(reference) {
                Some(file_id) => Attachment::File(file_id.to_string()),
                None => Url::parse(reference).map(Attachment::Url).unwrap_or(Attachment::None),
            },
        }
    }
}

/// Sends a stored broadcast and records the counters
pub async fn run_broadcast(bot: &Bot, db_pool: &DbPool, broadcast_id: i64) -> AppResult<BroadcastReport> {
    let broadcast = {
        let conn = get_connection(db_pool)?;
        broadcasts::get_broadcast(&conn, broadcast_id)?
    }
    .ok_or_else(|| AppError::Validation(format!("broadcast {} does not exist", broadcast_id)))?;

    let targets = recipients(db_pool, broadcast.target)?;
    log::info!(
        "📣 Broadcast #{} started: {} recipients ({})",
        broadcast_id,
        targets.len(),
        broadcast.target
    );

    let attachment = Attachment::from_stored(broadcast.photo_url.as_deref());
    let content = broadcast.content.clone();

    let report = deliver_all(db_pool, &targets, |chat_id| {
        let bot = bot.clone();
        let content = content.clone();
        let photo = match &attachment {
            Attachment::None => None,
            Attachment::File(id) => Some(InputFile::file_id(FileId(id.clone()))),
            Attachment::Url(url) => Some(InputFile::url(url.clone())),
        };
        async move {
            match photo {
                Some(photo) => bot.send_photo(chat_id, photo).caption(content).await.map(|_| ()),
                None => bot.send_message(chat_id, content).await.map(|_| ()),
            }
        }
    })
    .await;

    {
        let conn = get_connection(db_pool)?;
        broadcasts::mark_broadcast_sent(&conn, broadcast_id, report.sent, report.failed)?;
    }
    log::info!(
        "📣 Broadcast #{} finished: delivered {}, failed {}",
        broadcast_id,
        report.sent,
        report.failed
    );
    Ok(report)
}
