//! Logging initialization and configuration diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup configuration summary

use anyhow::Result;
use simplelog::*;
use std::fs::OpenOptions;

use crate::core::config;

/// Initialize logger for both console and file output
///
/// The log file is opened in append mode so restarts keep the history.
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| anyhow::anyhow!("Failed to open log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// One line of the configuration report: name, human readable value, is it fine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCheck {
    pub name: &'static str,
    pub value: String,
    pub ok: bool,
}

/// Collects the configuration report without exposing secrets
pub fn configuration_report() -> Vec<ConfigCheck> {
    let lookup_flag = *config::delivery::PICKUP_POINT_LOOKUP_ENABLED;
    let delivery_token = config::delivery::DELIVERY_API_TOKEN.is_some();

    vec![
        ConfigCheck {
            name: "BOT_TOKEN",
            value: if config::BOT_TOKEN.is_empty() { "missing" } else { "set" }.to_string(),
            ok: !config::BOT_TOKEN.is_empty(),
        },
        ConfigCheck {
            name: "DATABASE_PATH",
            value: config::DATABASE_PATH.clone(),
            ok: true,
        },
        ConfigCheck {
            name: "ADMIN_IDS",
            value: format!("{} admin(s)", config::admin::ADMIN_IDS.len()),
            ok: !config::admin::ADMIN_IDS.is_empty(),
        },
        ConfigCheck {
            name: "CHANNEL_ID",
            value: config::CHANNEL_ID
                .map(|id| id.to_string())
                .unwrap_or_else(|| "not set".to_string()),
            ok: true,
        },
        ConfigCheck {
            name: "PAYMENT_PHONE",
            value: config::payment::PAYMENT_PHONE.clone(),
            ok: true,
        },
        ConfigCheck {
            name: "PICKUP_POINT_LOOKUP_ENABLED",
            value: lookup_flag.to_string(),
            ok: true,
        },
        ConfigCheck {
            name: "DELIVERY_API_TOKEN",
            value: if delivery_token { "set" } else { "missing" }.to_string(),
            // a missing token only matters when the lookup was asked for
            ok: delivery_token || !lookup_flag,
        },
    ]
}

/// Logs the configuration report at application startup
pub fn log_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for check in configuration_report() {
        if check.ok {
            log::info!("✅ {}: {}", check.name, check.value);
        } else {
            log::warn!("⚠️  {}: {}", check.name, check.value);
        }
    }

    if config::delivery::lookup_enabled() {
        log::info!("📦 Pickup-point lookup is ON ({})", *config::delivery::DELIVERY_API_URL);
    } else {
        log::info!("📦 Pickup-point lookup is OFF, checkout asks for a free-text address");
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
