use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server URL (optional)
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| non_empty_var("BOT_API_URL"));

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: merchbot.sqlite
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "merchbot.sqlite".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: merchbot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "merchbot.log".to_string()));

/// Club channel whose join/leave events feed the subscription statistics.
/// Membership tracking is skipped when unset.
pub static CHANNEL_ID: Lazy<Option<i64>> =
    Lazy::new(|| non_empty_var("CHANNEL_ID").and_then(|raw| raw.parse::<i64>().ok()));

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parses typical truthy flag values: 1, true, yes, on
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    pub(crate) fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

    /// Returns true when the Telegram user id belongs to an admin
    pub fn is_admin(telegram_id: i64) -> bool {
        ADMIN_IDS.contains(&telegram_id)
    }
}

/// Manual bank-transfer payment settings
pub mod payment {
    use once_cell::sync::Lazy;
    use std::env;

    /// Phone number the customer transfers money to
    pub static PAYMENT_PHONE: Lazy<String> =
        Lazy::new(|| env::var("PAYMENT_PHONE").unwrap_or_else(|_| "+7 900 000-00-00".to_string()));

    /// Bank name shown next to the phone number (optional)
    pub static PAYMENT_BANK: Lazy<Option<String>> = Lazy::new(|| super::non_empty_var("PAYMENT_BANK"));

    /// Currency label used for cart and order totals
    pub const DISPLAY_CURRENCY: &str = "RUB";
}

/// Third-party delivery (pickup-point lookup) settings
pub mod delivery {
    use super::Duration;
    use once_cell::sync::Lazy;
    use std::env;

    /// Feature flag enabling the city / pickup-point lookup path of checkout
    pub static PICKUP_POINT_LOOKUP_ENABLED: Lazy<bool> = Lazy::new(|| {
        env::var("PICKUP_POINT_LOOKUP_ENABLED")
            .map(|raw| super::parse_flag(&raw))
            .unwrap_or(false)
    });

    /// Base URL of the logistics platform API
    pub static DELIVERY_API_URL: Lazy<String> = Lazy::new(|| {
        env::var("DELIVERY_API_URL").unwrap_or_else(|_| "https://b2b-authproxy.taxi.yandex.net".to_string())
    });

    /// Bearer token for the logistics platform API
    pub static DELIVERY_API_TOKEN: Lazy<Option<String>> = Lazy::new(|| super::non_empty_var("DELIVERY_API_TOKEN"));

    /// Lookup runs only when the flag is on and a token is configured
    pub fn lookup_enabled() -> bool {
        *PICKUP_POINT_LOOKUP_ENABLED && DELIVERY_API_TOKEN.is_some()
    }

    /// Timeout for a single resolver request (in seconds)
    pub const TIMEOUT_SECS: u64 = 10;

    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Checkout conversation configuration
pub mod checkout {
    /// Maximum number of city / pickup-point options offered at once
    pub const MAX_CHOICES: usize = 5;

    /// Reply the customer may type instead of a comment
    pub const NO_COMMENT_WORDS: &[&str] = &["нет", "no", "-"];
}

/// Broadcast configuration
pub mod broadcast {
    use super::Duration;

    /// Delay between messages to stay below Telegram's flood limits (in milliseconds)
    pub const SEND_DELAY_MS: u64 = 50;

    pub fn send_delay() -> Duration {
        Duration::from_millis(SEND_DELAY_MS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum number of retries for dispatcher reconnection
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Delay between dispatcher retry attempts (in seconds)
    pub const DISPATCHER_RETRY_DELAY_SECS: u64 = 5;

    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(DISPATCHER_RETRY_DELAY_SECS)
    }
}
