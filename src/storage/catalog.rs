//! Catalog lookup: read-only product, variant and image queries

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::core::error::AppResult;
use crate::core::types::format_money;
use crate::storage::db::{decimal_at, string_list_at, string_list_to_sql};

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub photo_url: Option<String>,
    pub size_guide_url: Option<String>,
    /// Advisory only, never decremented by orders
    pub stock: i64,
    pub gender_required: bool,
    /// Free-form questions asked before the product is added to the cart
    pub questions: Vec<String>,
    pub is_preorder: bool,
    pub preorder_end_date: Option<String>,
    pub estimated_delivery_date: Option<String>,
    pub status: String,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.status == "active" && (self.is_preorder || self.stock > 0)
    }

    pub fn formatted_price(&self) -> String {
        format_money(self.price, &self.currency)
    }

    pub fn has_questions(&self) -> bool {
        !self.questions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub stock: i64,
}

impl ProductVariant {
    pub fn is_available(&self) -> bool {
        self.stock > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub id: i64,
    pub product_id: i64,
    pub url: String,
    pub position: i64,
}

const PRODUCT_COLUMNS: &str = "id, name, description, price, currency, photo_url, size_guide_url, stock, gender_required, questions, is_preorder, preorder_end_date, estimated_delivery_date, status";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: decimal_at(row, 3)?,
        currency: row.get(4)?,
        photo_url: row.get(5)?,
        size_guide_url: row.get(6)?,
        stock: row.get(7)?,
        gender_required: row.get::<_, i64>(8)? != 0,
        questions: string_list_at(row, 9)?,
        is_preorder: row.get::<_, i64>(10)? != 0,
        preorder_end_date: row.get(11)?,
        estimated_delivery_date: row.get(12)?,
        status: row.get(13)?,
    })
}

fn variant_from_row(row: &Row<'_>) -> rusqlite::Result<ProductVariant> {
    Ok(ProductVariant {
        id: row.get(0)?,
        product_id: row.get(1)?,
        name: row.get(2)?,
        stock: row.get(3)?,
    })
}

pub fn get_active_products(conn: &Connection) -> AppResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE status = 'active' ORDER BY id",
        PRODUCT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let products = stmt.query_map([], product_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(products)
}

pub fn get_product_by_id(conn: &Connection, product_id: i64) -> AppResult<Option<Product>> {
    let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
    Ok(conn.query_row(&sql, [product_id], product_from_row).optional()?)
}

pub fn get_product_variants(conn: &Connection, product_id: i64) -> AppResult<Vec<ProductVariant>> {
    let mut stmt =
        conn.prepare("SELECT id, product_id, name, stock FROM product_variants WHERE product_id = ?1 ORDER BY id")?;
    let variants = stmt
        .query_map([product_id], variant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(variants)
}

/// Fetches a variant only if it belongs to the given product
pub fn get_variant(conn: &Connection, product_id: i64, variant_id: i64) -> AppResult<Option<ProductVariant>> {
    Ok(conn
        .query_row(
            "SELECT id, product_id, name, stock FROM product_variants WHERE id = ?1 AND product_id = ?2",
            [variant_id, product_id],
            variant_from_row,
        )
        .optional()?)
}

pub fn get_product_images(conn: &Connection, product_id: i64) -> AppResult<Vec<ProductImage>> {
    let mut stmt = conn.prepare(
        "SELECT id, product_id, url, position FROM product_images WHERE product_id = ?1 ORDER BY position, id",
    )?;
    let images = stmt
        .query_map([product_id], |row| {
            Ok(ProductImage {
                id: row.get(0)?,
                product_id: row.get(1)?,
                url: row.get(2)?,
                position: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(images)
}

/// Fields for seeding the catalog (demo data and tests)
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub currency: String,
    pub stock: i64,
    pub photo_url: Option<String>,
    pub gender_required: bool,
    pub questions: Vec<String>,
    pub is_preorder: bool,
    pub estimated_delivery_date: Option<String>,
}

impl NewProduct {
    pub fn new(name: &str, price: Decimal) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            price,
            currency: "RUB".to_string(),
            stock: 10,
            photo_url: None,
            gender_required: false,
            questions: Vec::new(),
            is_preorder: false,
            estimated_delivery_date: None,
        }
    }
}

pub fn insert_product(conn: &Connection, product: &NewProduct) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO products (name, description, price, currency, stock, photo_url, gender_required, questions, is_preorder, estimated_delivery_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            product.name,
            product.description,
            product.price.to_string(),
            product.currency,
            product.stock,
            product.photo_url,
            product.gender_required as i64,
            string_list_to_sql(&product.questions)?,
            product.is_preorder as i64,
            product.estimated_delivery_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_variant(conn: &Connection, product_id: i64, name: &str, stock: i64) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO product_variants (product_id, name, stock) VALUES (?1, ?2, ?3)",
        params![product_id, name, stock],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_product_image(conn: &Connection, product_id: i64, url: &str, position: i64) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO product_images (product_id, url, position) VALUES (?1, ?2, ?3)",
        params![product_id, url, position],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Test-only price mutation to simulate an admin edit
#[doc(hidden)]
pub fn set_product_price(conn: &Connection, product_id: i64, price: Decimal) -> AppResult<()> {
    conn.execute(
        "UPDATE products SET price = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        params![price.to_string(), product_id],
    )?;
    Ok(())
}
