//! Broadcast history

use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::str::FromStr;

use crate::core::error::AppResult;

/// Which users receive a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastTarget {
    /// Users that opted in
    #[default]
    Consent,
    /// Every reachable user
    All,
}

impl BroadcastTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastTarget::Consent => "consent",
            BroadcastTarget::All => "all",
        }
    }
}

impl fmt::Display for BroadcastTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BroadcastTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consent" => Ok(BroadcastTarget::Consent),
            "all" => Ok(BroadcastTarget::All),
            _ => Err(format!("Unknown broadcast target: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub id: i64,
    pub content: String,
    pub photo_url: Option<String>,
    pub target: BroadcastTarget,
    pub status: String,
    pub sent_count: i64,
    pub failed_count: i64,
    pub created_at: String,
    pub sent_at: Option<String>,
}

pub fn create_broadcast(
    conn: &Connection,
    content: &str,
    photo_url: Option<&str>,
    target: BroadcastTarget,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO broadcasts (content, photo_url, target_segment) VALUES (?1, ?2, ?3)",
        params![content, photo_url, target.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_broadcast(conn: &Connection, broadcast_id: i64) -> AppResult<Option<Broadcast>> {
    let broadcast = conn
        .query_row(
            "SELECT id, content, photo_url, target_segment, status, sent_count, failed_count, created_at, sent_at
             FROM broadcasts WHERE id = ?1",
            [broadcast_id],
            |row| {
                let target: String = row.get(3)?;
                Ok(Broadcast {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    photo_url: row.get(2)?,
                    target: BroadcastTarget::from_str(&target).unwrap_or_default(),
                    status: row.get(4)?,
                    sent_count: row.get(5)?,
                    failed_count: row.get(6)?,
                    created_at: row.get(7)?,
                    sent_at: row.get(8)?,
                })
            },
        )
        .optional()?;
    Ok(broadcast)
}

pub fn mark_broadcast_sent(conn: &Connection, broadcast_id: i64, sent: usize, failed: usize) -> AppResult<()> {
    conn.execute(
        "UPDATE broadcasts SET status = 'sent', sent_count = ?1, failed_count = ?2, sent_at = CURRENT_TIMESTAMP
         WHERE id = ?3",
        params![sent as i64, failed as i64, broadcast_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::users::test_support::memory_db;

    #[test]
    fn test_broadcast_lifecycle() {
        let conn = memory_db();
        let id = create_broadcast(&conn, "Новая коллекция!", None, BroadcastTarget::All).unwrap();
        let draft = get_broadcast(&conn, id).unwrap().unwrap();
        assert_eq!(draft.status, "draft");
        assert_eq!(draft.target, BroadcastTarget::All);

        mark_broadcast_sent(&conn, id, 12, 3).unwrap();
        let sent = get_broadcast(&conn, id).unwrap().unwrap();
        assert_eq!(sent.status, "sent");
        assert_eq!((sent.sent_count, sent.failed_count), (12, 3));
        assert!(sent.sent_at.is_some());
    }
}
