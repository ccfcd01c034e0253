//! Test fixtures: a migrated SQLite database in a temporary directory plus seeding helpers

#![allow(dead_code)]

use merchbot::storage::cart::{self, NewCartLine};
use merchbot::storage::catalog::{self, NewProduct};
use merchbot::storage::users::{self, TelegramProfile};
use merchbot::storage::{create_pool, DbConnection, DbPool};
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Database environment for one test
///
/// # Example
/// ```ignore
/// let env = TestEnvironment::new();
/// env.register(1001);
/// let shirt = env.product("FATRACING T-Shirt", 1500);
/// env.add_to_cart(1001, shirt, 2);
/// ```
pub struct TestEnvironment {
    /// Keeps the database file alive for the test duration
    _dir: TempDir,
    pub db_pool: DbPool,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merchbot.sqlite");
        let db_pool = create_pool(path.to_str().unwrap()).unwrap();
        Self { _dir: dir, db_pool }
    }

    pub fn conn(&self) -> DbConnection {
        self.db_pool.get().unwrap()
    }

    pub fn register(&self, telegram_id: i64) {
        users::upsert_user(
            &self.conn(),
            &TelegramProfile {
                telegram_id,
                first_name: Some("Ivan".to_string()),
                username: Some(format!("rider{}", telegram_id)),
                language_code: Some("ru".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    }

    pub fn product(&self, name: &str, price: i64) -> i64 {
        catalog::insert_product(&self.conn(), &NewProduct::new(name, Decimal::new(price, 0))).unwrap()
    }

    pub fn seed_product(&self, product: &NewProduct) -> i64 {
        catalog::insert_product(&self.conn(), product).unwrap()
    }

    pub fn add_to_cart(&self, telegram_id: i64, product_id: i64, quantity: u32) -> i64 {
        cart::add_to_cart(
            &self.conn(),
            telegram_id,
            &NewCartLine::product(product_id).with_quantity(quantity),
        )
        .unwrap()
    }
}
