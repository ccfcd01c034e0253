//! Bot initialization and the command enum
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command list registration for the Telegram UI

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Команды магазина:")]
pub enum Command {
    #[command(description = "главное меню")]
    Start,
    #[command(description = "главное меню")]
    Menu,
    #[command(description = "корзина")]
    Cart,
    #[command(description = "мои заказы")]
    Orders,
    #[command(description = "прервать оформление заказа")]
    Cancel,
    #[command(description = "последние заказы (только для администраторов)")]
    AdminOrders,
    #[command(description = "подтвердить оплату: /confirm <номер>")]
    Confirm(String),
    #[command(description = "снять подтверждение оплаты: /unconfirm <номер>")]
    Unconfirm(String),
    #[command(description = "сменить статус: /status <номер> <статус>")]
    Status(String),
    #[command(description = "рассылка: /broadcast [all] <текст>")]
    Broadcast(String),
}

impl Command {
    /// Admin-only commands never reach regular customers
    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Command::AdminOrders
                | Command::Confirm(_)
                | Command::Unconfirm(_)
                | Command::Status(_)
                | Command::Broadcast(_)
        )
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to create bot (missing token, invalid URL)
pub fn create_bot() -> anyhow::Result<Bot> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("BOT_TOKEN (or TELOXIDE_TOKEN) is not set");
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(config::BOT_TOKEN.as_str(), client);

    let bot = match config::BOT_API_URL.as_deref() {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
///
/// Only customer commands are listed; admin commands stay hidden.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "главное меню"),
        BotCommand::new("cart", "корзина"),
        BotCommand::new("orders", "мои заказы"),
        BotCommand::new("cancel", "прервать оформление заказа"),
    ])
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", "merchbot").ok(), Some(Command::Start));
        assert_eq!(Command::parse("/admin_orders", "merchbot").ok(), Some(Command::AdminOrders));
        assert_eq!(
            Command::parse("/status 12 completed", "merchbot").ok(),
            Some(Command::Status("12 completed".to_string()))
        );
        assert_eq!(
            Command::parse("/broadcast all Привет", "merchbot").ok(),
            Some(Command::Broadcast("all Привет".to_string()))
        );
    }

    #[test]
    fn test_admin_only_commands() {
        assert!(Command::Confirm("1".to_string()).is_admin_only());
        assert!(Command::AdminOrders.is_admin_only());
        assert!(!Command::Cart.is_admin_only());
        assert!(!Command::Cancel.is_admin_only());
    }
}
