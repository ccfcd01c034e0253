//! Cart store: per-user lines keyed by (product, variant, gender) unless answers are attached

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::core::error::{AppError, AppResult};
use crate::core::types::Gender;
use crate::storage::db::{decimal_at, string_list_at, string_list_to_sql};
use crate::storage::users::resolve_user_id;

/// A line the user wants to put into the cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartLine {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub gender: Option<Gender>,
    pub answers: Vec<String>,
    pub quantity: u32,
}

impl NewCartLine {
    pub fn product(product_id: i64) -> Self {
        Self {
            product_id,
            variant_id: None,
            gender: None,
            answers: Vec::new(),
            quantity: 1,
        }
    }

    pub fn with_variant(mut self, variant_id: Option<i64>) -> Self {
        self.variant_id = variant_id;
        self
    }

    pub fn with_gender(mut self, gender: Option<Gender>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_answers(mut self, answers: Vec<String>) -> Self {
        self.answers = answers;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }
}

/// Identity of a cart line for merging purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeKey {
    /// Repeated adds with the same key increment one line
    Merged {
        product_id: i64,
        variant_id: Option<i64>,
        gender: Option<Gender>,
    },
    /// Lines carrying answers are never merged
    Unique,
}

pub fn merge_key(line: &NewCartLine) -> MergeKey {
    if line.answers.is_empty() {
        MergeKey::Merged {
            product_id: line.product_id,
            variant_id: line.variant_id,
            gender: line.gender,
        }
    } else {
        MergeKey::Unique
    }
}

/// Cart line joined with product and variant data
#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub price: Decimal,
    pub currency: String,
    pub is_preorder: bool,
    pub variant_id: Option<i64>,
    pub variant_name: Option<String>,
    pub gender: Option<Gender>,
    pub answers: Vec<String>,
    pub quantity: i64,
    pub added_at: String,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// `Name (M, f)` style label used in cart and order listings
    pub fn display_name(&self) -> String {
        let mut details: Vec<String> = Vec::new();
        if let Some(variant) = &self.variant_name {
            details.push(variant.clone());
        }
        if let Some(gender) = self.gender {
            details.push(gender.to_string());
        }
        details.extend(self.answers.iter().cloned());

        if details.is_empty() {
            self.product_name.clone()
        } else {
            format!("{} ({})", self.product_name, details.join(", "))
        }
    }
}

fn cart_item_from_row(row: &Row<'_>) -> rusqlite::Result<CartItem> {
    Ok(CartItem {
        id: row.get(0)?,
        product_id: row.get(1)?,
        product_name: row.get(2)?,
        price: decimal_at(row, 3)?,
        currency: row.get(4)?,
        is_preorder: row.get::<_, i64>(5)? != 0,
        variant_id: row.get(6)?,
        variant_name: row.get(7)?,
        gender: row.get(8)?,
        answers: string_list_at(row, 9)?,
        quantity: row.get(10)?,
        added_at: row.get(11)?,
    })
}

/// Adds a line to the user's cart and returns the affected line id.
///
/// Lines without answers merge with an existing line of the same product, variant and
/// gender; the merged line moves to the end of the cart ordering.
pub fn add_to_cart(conn: &Connection, telegram_id: i64, line: &NewCartLine) -> AppResult<i64> {
    if line.quantity == 0 {
        return Err(AppError::Validation("quantity must be positive".to_string()));
    }
    let user_id = resolve_user_id(conn, telegram_id)?;

    if let MergeKey::Merged {
        product_id,
        variant_id,
        gender,
    } = merge_key(line)
    {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM cart_items
                 WHERE user_id = ?1 AND product_id = ?2 AND variant_id IS ?3 AND gender IS ?4
                   AND (answers IS NULL OR answers = '' OR answers = '[]')
                 ORDER BY id LIMIT 1",
                params![user_id, product_id, variant_id, gender],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(line_id) = existing {
            conn.execute(
                "UPDATE cart_items SET quantity = quantity + ?1, added_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?2",
                params![line.quantity, line_id],
            )?;
            return Ok(line_id);
        }
    }

    conn.execute(
        "INSERT INTO cart_items (user_id, product_id, variant_id, gender, answers, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id,
            line.product_id,
            line.variant_id,
            line.gender,
            string_list_to_sql(&line.answers)?,
            line.quantity,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Cart lines in add order; unknown users simply have an empty cart
pub fn get_cart_items(conn: &Connection, telegram_id: i64) -> AppResult<Vec<CartItem>> {
    let mut stmt = conn.prepare(
        "SELECT ci.id, p.id, p.name, p.price, p.currency, p.is_preorder,
                ci.variant_id, pv.name, ci.gender, ci.answers, ci.quantity, ci.added_at
         FROM cart_items ci
         JOIN users u ON u.id = ci.user_id
         JOIN products p ON p.id = ci.product_id
         LEFT JOIN product_variants pv ON pv.id = ci.variant_id
         WHERE u.telegram_id = ?1
         ORDER BY ci.added_at, ci.id",
    )?;
    let items = stmt
        .query_map([telegram_id], cart_item_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Deletes a line only when it belongs to the given user
pub fn remove_from_cart(conn: &Connection, line_id: i64, telegram_id: i64) -> AppResult<bool> {
    let deleted = conn.execute(
        "DELETE FROM cart_items
         WHERE id = ?1 AND user_id = (SELECT id FROM users WHERE telegram_id = ?2)",
        params![line_id, telegram_id],
    )?;
    Ok(deleted > 0)
}

/// Removes every line of the user, returns how many were removed
pub fn clear_cart(conn: &Connection, telegram_id: i64) -> AppResult<usize> {
    let deleted = conn.execute(
        "DELETE FROM cart_items WHERE user_id = (SELECT id FROM users WHERE telegram_id = ?1)",
        [telegram_id],
    )?;
    Ok(deleted)
}

pub fn cart_total(items: &[CartItem]) -> Decimal {
    items.iter().map(CartItem::line_total).sum()
}

/// Sum of price × quantity; zero for an empty cart or unknown user
pub fn get_cart_total(conn: &Connection, telegram_id: i64) -> AppResult<Decimal> {
    Ok(cart_total(&get_cart_items(conn, telegram_id)?))
}

pub fn is_cart_empty(conn: &Connection, telegram_id: i64) -> AppResult<bool> {
    let lines: i64 = conn.query_row(
        "SELECT COUNT(*) FROM cart_items ci JOIN users u ON u.id = ci.user_id WHERE u.telegram_id = ?1",
        [telegram_id],
        |row| row.get(0),
    )?;
    Ok(lines == 0)
}
