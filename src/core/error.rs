use teloxide::{ApiError, RequestError};
use thiserror::Error;

/// Centralized error types for the application
///
/// Infrastructure failures (database, Telegram, HTTP) convert automatically via `#[from]`.
/// The domain variants (`UserNotFound`, `EmptyCart`, `ResolverUnavailable`) carry the
/// shop's own failure taxonomy and are matched on by the handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Cart or order operation for a Telegram user that was never registered
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// Checkout attempted (or continued) with an empty cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Pickup-point lookup API failed; callers fall back to free text
    #[error("Pickup-point resolver unavailable: {0}")]
    ResolverUnavailable(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True when the error is the Telegram "this chat can't receive messages" family
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, AppError::Telegram(e) if is_blocked_by_user(e))
    }
}

/// Classifies a Telegram send error as a delivery failure to a blocked or deleted user.
///
/// Such users are marked inactive in the registry instead of aborting the caller.
pub fn is_blocked_by_user(err: &RequestError) -> bool {
    match err {
        RequestError::Api(api) => match api {
            ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::ChatNotFound | ApiError::BotKicked => true,
            other => format!("{:?}", other).contains("Forbidden"),
        },
        _ => false,
    }
}
