//! Orders: atomic cart-to-order transition and admin mutations

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::core::error::{AppError, AppResult};
use crate::core::types::{Gender, OrderStatus};
use crate::storage::cart::{cart_total, get_cart_items};
use crate::storage::db::{decimal_at, string_list_at, string_list_to_sql};
use crate::storage::users::resolve_user_id;

/// Customer and delivery data collected by the checkout conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer_name: String,
    pub phone: Option<String>,
    /// City, or the free-text pickup address when the lookup is off
    pub city: String,
    pub comment: String,
    pub pickup_label: Option<String>,
    pub pickup_id: Option<String>,
    pub geo_id: Option<i64>,
    pub payment_proof_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub telegram_id: i64,
    pub status: OrderStatus,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub city_country: Option<String>,
    pub comment: Option<String>,
    pub total_amount: Decimal,
    pub payment_proof_url: Option<String>,
    pub payment_confirmed: bool,
    pub payment_confirmed_at: Option<String>,
    pub delivery_geo_id: Option<i64>,
    pub delivery_pickup_id: Option<String>,
    pub delivery_pickup_address: Option<String>,
    pub created_at: String,
}

/// Frozen copy of a cart line
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub variant_id: Option<i64>,
    pub variant_name: Option<String>,
    pub gender: Option<Gender>,
    pub answers: Vec<String>,
    pub quantity: i64,
    pub price_per_unit: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price_per_unit * Decimal::from(self.quantity)
    }

    pub fn display_name(&self) -> String {
        let name = self.product_name.clone().unwrap_or_else(|| format!("#{}", self.product_id.unwrap_or_default()));
        let mut details: Vec<String> = Vec::new();
        if let Some(variant) = &self.variant_name {
            details.push(variant.clone());
        }
        if let Some(gender) = self.gender {
            details.push(gender.to_string());
        }
        details.extend(self.answers.iter().cloned());
        if details.is_empty() {
            name
        } else {
            format!("{} ({})", name, details.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

const ORDER_COLUMNS: &str = "o.id, o.user_id, u.telegram_id, o.status, o.customer_name, o.phone, o.city_country, o.comment, o.total_amount, o.payment_proof_url, o.payment_confirmed, o.payment_confirmed_at, o.delivery_geo_id, o.delivery_pickup_id, o.delivery_pickup_address, o.created_at";

fn order_from_row(row: &Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        user_id: row.get(1)?,
        telegram_id: row.get(2)?,
        status: row.get(3)?,
        customer_name: row.get(4)?,
        phone: row.get(5)?,
        city_country: row.get(6)?,
        comment: row.get(7)?,
        total_amount: decimal_at(row, 8)?,
        payment_proof_url: row.get(9)?,
        payment_confirmed: row.get::<_, i64>(10)? != 0,
        payment_confirmed_at: row.get(11)?,
        delivery_geo_id: row.get(12)?,
        delivery_pickup_id: row.get(13)?,
        delivery_pickup_address: row.get(14)?,
        created_at: row.get(15)?,
    })
}

/// Joins the pickup label and the customer comment, label first.
///
/// The label alone is not copied into the comment, it already has its own column.
pub fn combine_comment(pickup_label: Option<&str>, comment: &str) -> String {
    let comment = comment.trim();
    match pickup_label.map(str::trim).filter(|label| !label.is_empty()) {
        Some(label) if !comment.is_empty() => format!("{}\n{}", label, comment),
        _ => comment.to_string(),
    }
}

/// Turns the current cart into an order.
///
/// Everything runs in one transaction: the cart is re-read, the total recomputed from
/// live prices, the header and one item per line inserted, and the cart cleared.
/// An empty cart fails with `EmptyCart` and nothing is written.
pub fn create_order_from_cart(conn: &mut Connection, telegram_id: i64, draft: &OrderDraft) -> AppResult<Order> {
    let tx = conn.transaction()?;

    let user_id = resolve_user_id(&tx, telegram_id)?;
    let items = get_cart_items(&tx, telegram_id)?;
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }
    let total = cart_total(&items);
    let comment = Some(combine_comment(draft.pickup_label.as_deref(), &draft.comment)).filter(|c| !c.is_empty());

    tx.execute(
        "INSERT INTO orders (user_id, status, customer_name, phone, city_country, comment, total_amount,
                             payment_proof_url, payment_confirmed, delivery_geo_id, delivery_pickup_id, delivery_pickup_address)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?11)",
        params![
            user_id,
            OrderStatus::New,
            draft.customer_name,
            draft.phone,
            draft.city,
            comment,
            total.to_string(),
            draft.payment_proof_url,
            draft.geo_id,
            draft.pickup_id,
            draft.pickup_label,
        ],
    )?;
    let order_id = tx.last_insert_rowid();

    {
        let mut insert_item = tx.prepare(
            "INSERT INTO order_items (order_id, product_id, variant_id, gender, answers, quantity, price_per_unit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for item in &items {
            insert_item.execute(params![
                order_id,
                item.product_id,
                item.variant_id,
                item.gender,
                string_list_to_sql(&item.answers)?,
                item.quantity,
                item.price.to_string(),
            ])?;
        }
    }

    tx.execute("DELETE FROM cart_items WHERE user_id = ?1", [user_id])?;

    let order = get_order_by_id(&tx, order_id)?.ok_or_else(|| AppError::Validation(format!("order {} vanished", order_id)))?;
    tx.commit()?;

    log::info!(
        "🧾 Order #{} created for user {}: {} line(s), total {}",
        order.id,
        telegram_id,
        items.len(),
        order.total_amount
    );
    Ok(order)
}

pub fn get_order_by_id(conn: &Connection, order_id: i64) -> AppResult<Option<Order>> {
    let sql = format!(
        "SELECT {} FROM orders o JOIN users u ON u.id = o.user_id WHERE o.id = ?1",
        ORDER_COLUMNS
    );
    Ok(conn.query_row(&sql, [order_id], order_from_row).optional()?)
}

/// Most recent order of the user, used to prefill checkout
pub fn get_latest_order_for_user(conn: &Connection, telegram_id: i64) -> AppResult<Option<Order>> {
    let sql = format!(
        "SELECT {} FROM orders o JOIN users u ON u.id = o.user_id
         WHERE u.telegram_id = ?1 ORDER BY o.created_at DESC, o.id DESC LIMIT 1",
        ORDER_COLUMNS
    );
    Ok(conn.query_row(&sql, [telegram_id], order_from_row).optional()?)
}

pub fn get_order_items(conn: &Connection, order_id: i64) -> AppResult<Vec<OrderItem>> {
    let mut stmt = conn.prepare(
        "SELECT oi.id, oi.order_id, oi.product_id, p.name, oi.variant_id, pv.name, oi.gender, oi.answers,
                oi.quantity, oi.price_per_unit
         FROM order_items oi
         LEFT JOIN products p ON p.id = oi.product_id
         LEFT JOIN product_variants pv ON pv.id = oi.variant_id
         WHERE oi.order_id = ?1
         ORDER BY oi.id",
    )?;
    let items = stmt
        .query_map([order_id], |row| {
            Ok(OrderItem {
                id: row.get(0)?,
                order_id: row.get(1)?,
                product_id: row.get(2)?,
                product_name: row.get(3)?,
                variant_id: row.get(4)?,
                variant_name: row.get(5)?,
                gender: row.get(6)?,
                answers: string_list_at(row, 7)?,
                quantity: row.get(8)?,
                price_per_unit: decimal_at(row, 9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Order history of a user, newest first
pub fn get_orders_with_items(conn: &Connection, telegram_id: i64, limit: usize) -> AppResult<Vec<OrderWithItems>> {
    let sql = format!(
        "SELECT {} FROM orders o JOIN users u ON u.id = o.user_id
         WHERE u.telegram_id = ?1 ORDER BY o.created_at DESC, o.id DESC LIMIT ?2",
        ORDER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let orders = stmt
        .query_map(params![telegram_id, limit as i64], order_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    orders
        .into_iter()
        .map(|order| {
            let items = get_order_items(conn, order.id)?;
            Ok(OrderWithItems { order, items })
        })
        .collect()
}

pub fn count_orders_for_user(conn: &Connection, telegram_id: i64) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id WHERE u.telegram_id = ?1",
        [telegram_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Latest orders across all users, for admins
pub fn list_recent_orders(conn: &Connection, limit: usize) -> AppResult<Vec<Order>> {
    let sql = format!(
        "SELECT {} FROM orders o JOIN users u ON u.id = o.user_id ORDER BY o.created_at DESC, o.id DESC LIMIT ?1",
        ORDER_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let orders = stmt
        .query_map([limit as i64], order_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(orders)
}

/// Returns false when no such order exists
pub fn update_order_status(conn: &Connection, order_id: i64, status: OrderStatus) -> AppResult<bool> {
    let updated = conn.execute(
        "UPDATE orders SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        params![status, order_id],
    )?;
    Ok(updated > 0)
}

/// Sets or clears the payment confirmation together with its timestamp
pub fn set_payment_confirmed(conn: &Connection, order_id: i64, confirmed: bool) -> AppResult<bool> {
    let updated = conn.execute(
        "UPDATE orders SET payment_confirmed = ?1,
                payment_confirmed_at = CASE WHEN ?1 = 1 THEN CURRENT_TIMESTAMP ELSE NULL END,
                updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2",
        params![confirmed as i64, order_id],
    )?;
    Ok(updated > 0)
}
