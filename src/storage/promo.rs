//! Partner promo codes

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::core::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoCode {
    pub id: i64,
    pub partner_name: String,
    pub description: String,
    pub code: String,
    pub link: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String,
}

/// `DD.MM.YYYY` from an SQLite date or datetime string
pub fn format_date(raw: &str) -> Option<String> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%d.%m.%Y").to_string())
}

impl PromoCode {
    /// Human readable validity window, `None` when the code is open-ended
    pub fn formatted_dates(&self) -> Option<String> {
        let start = self.start_date.as_deref().and_then(format_date);
        let end = self.end_date.as_deref().and_then(format_date);
        match (start, end) {
            (Some(s), Some(e)) => Some(format!("{} – {}", s, e)),
            (None, Some(e)) => Some(format!("до {}", e)),
            (Some(s), None) => Some(format!("с {}", s)),
            (None, None) => None,
        }
    }
}

const PROMO_COLUMNS: &str = "id, partner_name, description, code, link, start_date, end_date, status";

fn promo_from_row(row: &Row<'_>) -> rusqlite::Result<PromoCode> {
    Ok(PromoCode {
        id: row.get(0)?,
        partner_name: row.get(1)?,
        description: row.get(2)?,
        code: row.get(3)?,
        link: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        status: row.get(7)?,
    })
}

/// Active codes whose validity window contains today
pub fn get_active_promo_codes(conn: &Connection) -> AppResult<Vec<PromoCode>> {
    let sql = format!(
        "SELECT {} FROM promo_codes
         WHERE status = 'active'
           AND (start_date IS NULL OR date(start_date) <= date('now'))
           AND (end_date IS NULL OR date(end_date) >= date('now'))
         ORDER BY id",
        PROMO_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let promos = stmt.query_map([], promo_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(promos)
}

pub fn get_promo_code_by_id(conn: &Connection, promo_id: i64) -> AppResult<Option<PromoCode>> {
    let sql = format!("SELECT {} FROM promo_codes WHERE id = ?1", PROMO_COLUMNS);
    Ok(conn.query_row(&sql, [promo_id], promo_from_row).optional()?)
}

pub fn insert_promo_code(
    conn: &Connection,
    partner_name: &str,
    description: &str,
    code: &str,
    link: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO promo_codes (partner_name, description, code, link, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![partner_name, description, code, link, start_date, end_date],
    )?;
    Ok(conn.last_insert_rowid())
}
