use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use teloxide::update_listeners::Polling;
use tokio::time::sleep;

use merchbot::cli::{Cli, Commands};
use merchbot::core::logging::configuration_report;
use merchbot::core::{config, init_logger, log_configuration};
use merchbot::delivery::{DisabledResolver, SharedResolver, YandexDeliveryClient};
use merchbot::storage::{create_pool, get_connection, seed};
use merchbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the merch bot
///
/// Parses CLI arguments and dispatches to the matching subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Set up global panic handler so dispatcher panics end up in the log
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) => run_bot().await,
        Some(Commands::Migrate { database }) => run_migrate(database),
        Some(Commands::CheckConfig) => run_check_config(),
        Some(Commands::SeedDemo { database }) => run_seed_demo(database),
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

fn database_path(database: Option<String>) -> String {
    database.unwrap_or_else(|| config::DATABASE_PATH.clone())
}

/// Opening the pool applies the pending migrations
fn run_migrate(database: Option<String>) -> Result<()> {
    let path = database_path(database);
    create_pool(&path).map_err(|e| anyhow::anyhow!("Failed to migrate {}: {}", path, e))?;
    log::info!("🗄️  Database {} is up to date", path);
    Ok(())
}

fn run_check_config() -> Result<()> {
    let report = configuration_report();
    for check in &report {
        let mark = if check.ok { "✅" } else { "❌" };
        println!("{} {}: {}", mark, check.name, check.value);
    }
    let failed = report.iter().filter(|c| !c.ok).count();
    if failed > 0 {
        anyhow::bail!("{} configuration problem(s) found", failed);
    }
    Ok(())
}

fn run_seed_demo(database: Option<String>) -> Result<()> {
    let path = database_path(database);
    let pool = create_pool(&path).map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path, e))?;
    let conn = get_connection(&pool)?;
    let report = seed::seed_demo(&conn)?;
    println!(
        "🌱 {}: {} products, {} promo codes added",
        path, report.products, report.promo_codes
    );
    Ok(())
}

fn build_resolver() -> Result<SharedResolver> {
    if !config::delivery::lookup_enabled() {
        return Ok(Arc::new(DisabledResolver));
    }
    match YandexDeliveryClient::from_env()? {
        Some(client) => Ok(Arc::new(client)),
        None => {
            log::warn!("Pickup-point lookup requested without DELIVERY_API_TOKEN, using free-text addresses");
            Ok(Arc::new(DisabledResolver))
        }
    }
}

/// Run the bot with long polling
async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    log_configuration();

    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );

    let resolver = build_resolver()?;
    let deps = HandlerDeps::new(
        Arc::clone(&db_pool),
        resolver,
        config::delivery::lookup_enabled(),
        *config::CHANNEL_ID,
    );

    let bot = create_bot()?;
    let me = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", me.username, me.id);

    setup_bot_commands(&bot).await?;

    let handler = schema(deps);
    let mut retry_count = 0;
    let max_retries = config::retry::MAX_DISPATCHER_RETRIES;

    // Run the dispatcher with retry logic
    loop {
        let bot_clone = bot.clone();
        let handler_clone = handler.clone();

        // Create a new dispatcher in a separate task to isolate panics
        let handle = tokio::spawn(async move {
            let listener = Polling::builder(bot_clone.clone())
                .allowed_updates(vec![
                    AllowedUpdate::Message,
                    AllowedUpdate::CallbackQuery,
                    AllowedUpdate::ChatMember,
                ])
                .drop_pending_updates()
                .build();

            Dispatcher::builder(bot_clone, handler_clone)
                .dependencies(DependencyMap::new())
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await
        });

        match handle.await {
            Ok(()) => {
                log::info!("Dispatcher shutdown gracefully");
                break;
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    log::error!("Dispatcher panicked: {}", join_err);

                    if retry_count < max_retries {
                        retry_count += 1;
                        log::info!(
                            "Retrying dispatcher connection after panic (attempt {}/{})...",
                            retry_count,
                            max_retries
                        );
                    } else {
                        log::error!("Max retries reached after panic. Exiting...");
                        break;
                    }
                } else {
                    log::warn!("Dispatcher task was cancelled: {}", join_err);
                    break;
                }
            }
        }

        // Add a delay between retries to avoid overwhelming the API
        sleep(config::retry::dispatcher_delay()).await;
    }

    Ok(())
}
