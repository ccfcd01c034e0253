//! User registry: maps Telegram identities to internal user ids

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::{AppError, AppResult};

/// Identity fields taken from an inbound Telegram update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelegramProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
}

impl TelegramProfile {
    pub fn from_user(user: &teloxide::types::User) -> Self {
        Self {
            telegram_id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
            language_code: user.language_code.clone(),
            is_premium: user.is_premium,
        }
    }
}

/// Registered bot user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: bool,
    pub is_blocked: bool,
    pub consent_to_broadcast: bool,
    pub created_at: String,
}

impl User {
    /// Name to greet the user with
    pub fn display_name(&self) -> String {
        self.first_name
            .clone()
            .or_else(|| self.username.as_ref().map(|u| format!("@{}", u)))
            .unwrap_or_else(|| self.telegram_id.to_string())
    }
}

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, last_name, language_code, is_premium, is_blocked, consent_to_broadcast, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        language_code: row.get(5)?,
        is_premium: row.get::<_, i64>(6)? != 0,
        is_blocked: row.get::<_, i64>(7)? != 0,
        consent_to_broadcast: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
    })
}

/// Creates the user or refreshes the profile fields.
///
/// Any interaction proves the chat is reachable again, so `is_blocked` is reset.
pub fn upsert_user(conn: &Connection, profile: &TelegramProfile) -> AppResult<User> {
    conn.execute(
        "INSERT INTO users (telegram_id, username, first_name, last_name, language_code, is_premium)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(telegram_id) DO UPDATE SET
            username = excluded.username,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            language_code = COALESCE(excluded.language_code, users.language_code),
            is_premium = excluded.is_premium,
            is_blocked = 0,
            updated_at = CURRENT_TIMESTAMP,
            last_interaction = CURRENT_TIMESTAMP",
        params![
            profile.telegram_id,
            profile.username,
            profile.first_name,
            profile.last_name,
            profile.language_code,
            profile.is_premium as i64,
        ],
    )?;

    get_user_by_telegram_id(conn, profile.telegram_id)?.ok_or(AppError::UserNotFound(profile.telegram_id))
}

pub fn get_user_by_telegram_id(conn: &Connection, telegram_id: i64) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE telegram_id = ?1", USER_COLUMNS);
    Ok(conn.query_row(&sql, [telegram_id], user_from_row).optional()?)
}

/// Resolves the internal user id, failing with `UserNotFound` for unregistered users
pub fn resolve_user_id(conn: &Connection, telegram_id: i64) -> AppResult<i64> {
    conn.query_row("SELECT id FROM users WHERE telegram_id = ?1", [telegram_id], |row| row.get(0))
        .optional()?
        .ok_or(AppError::UserNotFound(telegram_id))
}

pub fn set_broadcast_consent(conn: &Connection, telegram_id: i64, consent: bool) -> AppResult<()> {
    let updated = conn.execute(
        "UPDATE users SET consent_to_broadcast = ?1, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = ?2",
        params![consent as i64, telegram_id],
    )?;
    if updated == 0 {
        return Err(AppError::UserNotFound(telegram_id));
    }
    Ok(())
}

/// Flips the consent flag and returns the new value
pub fn toggle_broadcast_consent(conn: &Connection, telegram_id: i64) -> AppResult<bool> {
    let user = get_user_by_telegram_id(conn, telegram_id)?.ok_or(AppError::UserNotFound(telegram_id))?;
    let consent = !user.consent_to_broadcast;
    set_broadcast_consent(conn, telegram_id, consent)?;
    Ok(consent)
}

/// Reachable users that agreed to receive broadcasts
pub fn get_users_with_broadcast_consent(conn: &Connection) -> AppResult<Vec<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE consent_to_broadcast = 1 AND is_blocked = 0 ORDER BY id",
        USER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt.query_map([], user_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// All users that have not blocked the bot
pub fn get_active_users(conn: &Connection) -> AppResult<Vec<User>> {
    let sql = format!("SELECT {} FROM users WHERE is_blocked = 0 ORDER BY id", USER_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt.query_map([], user_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Marks a user unreachable after a delivery failure
pub fn mark_user_blocked(conn: &Connection, telegram_id: i64) -> AppResult<()> {
    conn.execute(
        "UPDATE users SET is_blocked = 1, updated_at = CURRENT_TIMESTAMP WHERE telegram_id = ?1",
        [telegram_id],
    )?;
    Ok(())
}

pub fn count_users(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_creates_then_updates() {
        let conn = memory_db();
        let first = register(&conn, 100);
        assert_eq!(first.telegram_id, 100);
        assert!(!first.consent_to_broadcast);

        let updated = upsert_user(
            &conn,
            &TelegramProfile {
                telegram_id: 100,
                username: Some("rider".to_string()),
                first_name: Some("Ivan".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.username.as_deref(), Some("rider"));
        // missing language keeps the stored one
        assert_eq!(updated.language_code.as_deref(), Some("ru"));
        assert_eq!(count_users(&conn).unwrap(), 1);
    }

    #[test]
    fn test_resolve_unknown_user() {
        let conn = memory_db();
        assert!(matches!(resolve_user_id(&conn, 5), Err(AppError::UserNotFound(5))));
        let user = register(&conn, 5);
        assert_eq!(resolve_user_id(&conn, 5).unwrap(), user.id);
    }

    #[test]
    fn test_consent_toggle_and_segments() {
        let conn = memory_db();
        register(&conn, 1);
        register(&conn, 2);
        register(&conn, 3);

        assert!(toggle_broadcast_consent(&conn, 1).unwrap());
        set_broadcast_consent(&conn, 2, true).unwrap();
        mark_user_blocked(&conn, 2).unwrap();

        let consenting: Vec<i64> = get_users_with_broadcast_consent(&conn)
            .unwrap()
            .iter()
            .map(|u| u.telegram_id)
            .collect();
        assert_eq!(consenting, vec![1]);
        assert_eq!(get_active_users(&conn).unwrap().len(), 2);

        assert!(!toggle_broadcast_consent(&conn, 1).unwrap());
        assert!(matches!(set_broadcast_consent(&conn, 99, true), Err(AppError::UserNotFound(99))));
    }

    #[test]
    fn test_interaction_unblocks_user() {
        let conn = memory_db();
        register(&conn, 7);
        mark_user_blocked(&conn, 7).unwrap();
        assert!(get_user_by_telegram_id(&conn, 7).unwrap().unwrap().is_blocked);
        let user = register(&conn, 7);
        assert!(!user.is_blocked);
    }
}
