//! Club channel membership periods

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::error::AppResult;
use crate::storage::users::resolve_user_id;

/// Opens a membership period; a repeated join while subscribed is a no-op
pub fn record_user_join(conn: &Connection, telegram_id: i64) -> AppResult<()> {
    let user_id = resolve_user_id(conn, telegram_id)?;
    let open: Option<i64> = conn
        .query_row(
            "SELECT id FROM channel_membership WHERE user_id = ?1 AND leave_date IS NULL LIMIT 1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    if open.is_some() {
        return Ok(());
    }

    conn.execute(
        "INSERT INTO channel_membership (user_id, join_date) VALUES (?1, CURRENT_TIMESTAMP)",
        [user_id],
    )?;
    Ok(())
}

/// Whole days between an SQLite `CURRENT_TIMESTAMP` value and now
fn days_since(raw: &str) -> i64 {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|joined| (Utc::now().naive_utc() - joined).num_days().max(0))
        .unwrap_or_else(|e| {
            log::warn!("Unparseable membership join date {:?}: {}", raw, e);
            0
        })
}

/// Closes the open period and stores its length in whole days.
///
/// Returns the days of the closed period, `None` when the user was not subscribed.
pub fn record_user_leave(conn: &Connection, telegram_id: i64) -> AppResult<Option<i64>> {
    let user_id = resolve_user_id(conn, telegram_id)?;
    let open: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, join_date FROM channel_membership
             WHERE user_id = ?1 AND leave_date IS NULL ORDER BY id DESC LIMIT 1",
            [user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((membership_id, join_date)) = open else {
        return Ok(None);
    };

    let days = days_since(&join_date);
    conn.execute(
        "UPDATE channel_membership SET leave_date = CURRENT_TIMESTAMP, days_subscribed = ?1 WHERE id = ?2",
        params![days, membership_id],
    )?;
    Ok(Some(days))
}

/// Closed periods plus the running one
pub fn get_total_subscription_days(conn: &Connection, telegram_id: i64) -> AppResult<i64> {
    let closed: i64 = conn.query_row(
        "SELECT COALESCE(SUM(cm.days_subscribed), 0)
         FROM channel_membership cm JOIN users u ON u.id = cm.user_id
         WHERE u.telegram_id = ?1 AND cm.leave_date IS NOT NULL",
        [telegram_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT cm.join_date FROM channel_membership cm JOIN users u ON u.id = cm.user_id
         WHERE u.telegram_id = ?1 AND cm.leave_date IS NULL AND cm.join_date IS NOT NULL",
    )?;
    let running: i64 = stmt
        .query_map([telegram_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?
        .iter()
        .map(|joined| days_since(joined))
        .sum();

    Ok(closed + running)
}

/// Whether the user currently has an open membership period
pub fn is_subscribed(conn: &Connection, telegram_id: i64) -> AppResult<bool> {
    let open: i64 = conn.query_row(
        "SELECT COUNT(*) FROM channel_membership cm JOIN users u ON u.id = cm.user_id
         WHERE u.telegram_id = ?1 AND cm.leave_date IS NULL",
        [telegram_id],
        |row| row.get(0),
    )?;
    Ok(open > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use crate::storage::users::test_support::{memory_db, register};

    #[test]
    fn test_join_leave_cycle_counts_days() {
        let conn = memory_db();
        let user = register(&conn, 1);

        record_user_join(&conn, 1).unwrap();
        record_user_join(&conn, 1).unwrap();
        assert!(is_subscribed(&conn, 1).unwrap());

        // backdate the open period by ten days
        conn.execute(
            "UPDATE channel_membership SET join_date = datetime('now', '-10 days') WHERE user_id = ?1",
            [user.id],
        )
        .unwrap();
        assert_eq!(get_total_subscription_days(&conn, 1).unwrap(), 10);

        assert_eq!(record_user_leave(&conn, 1).unwrap(), Some(10));
        assert!(!is_subscribed(&conn, 1).unwrap());
        assert_eq!(record_user_leave(&conn, 1).unwrap(), None);

        record_user_join(&conn, 1).unwrap();
        assert_eq!(get_total_subscription_days(&conn, 1).unwrap(), 10);
    }

    #[test]
    fn test_unknown_user() {
        let conn = memory_db();
        assert!(matches!(record_user_join(&conn, 9), Err(AppError::UserNotFound(9))));
        assert_eq!(get_total_subscription_days(&conn, 9).unwrap(), 0);
    }
}
