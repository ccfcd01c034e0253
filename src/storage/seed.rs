//! Demo catalog for local runs

use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::core::error::AppResult;
use crate::storage::catalog::{self, NewProduct};
use crate::storage::promo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub products: usize,
    pub promo_codes: usize,
}

/// Inserts a small demo catalog. Does nothing when products already exist.
pub fn seed_demo(conn: &Connection) -> AppResult<SeedReport> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
    if existing > 0 {
        log::info!("Catalog already has {} products, demo data skipped", existing);
        return Ok(SeedReport::default());
    }

    let mut report = SeedReport::default();

    let mut shirt = NewProduct::new("FATRACING T-Shirt", Decimal::new(1500, 0));
    shirt.description = "Cotton club t-shirt".to_string();
    shirt.gender_required = true;
    let shirt_id = catalog::insert_product(conn, &shirt)?;
    for (size, stock) in [("S", 3), ("M", 5), ("L", 5), ("XL", 0)] {
        catalog::insert_variant(conn, shirt_id, size, stock)?;
    }
    report.products += 1;

    let mut cap = NewProduct::new("Cycling Cap", Decimal::new(800, 0));
    cap.description = "Classic cotton cycling cap".to_string();
    cap.questions = vec!["Which print do you want on the visor?".to_string()];
    catalog::insert_product(conn, &cap)?;
    report.products += 1;

    let mut bottle = NewProduct::new("Water Bottle", Decimal::new(600, 0));
    bottle.description = "750 ml bottle with the club logo".to_string();
    bottle.is_preorder = true;
    bottle.estimated_delivery_date = Some("2026-12-01".to_string());
    catalog::insert_product(conn, &bottle)?;
    report.products += 1;

    promo::insert_promo_code(
        conn,
        "VELOSHOP",
        "15% off parts and accessories",
        "FAT15",
        Some("https://example.com/veloshop"),
        None,
        None,
    )?;
    report.promo_codes += 1;

    log::info!(
        "🌱 Seeded {} demo products and {} promo codes",
        report.products,
        report.promo_codes
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::users::test_support::memory_db;

    #[test]
    fn test_seed_demo_runs_once() {
        let conn = memory_db();
        let first = seed_demo(&conn).unwrap();
        assert_eq!(first, SeedReport { products: 3, promo_codes: 1 });
        assert_eq!(seed_demo(&conn).unwrap(), SeedReport::default());

        let products = catalog::get_active_products(&conn).unwrap();
        assert_eq!(products.len(), 3);
        let shirt = products.iter().find(|p| p.name == "FATRACING T-Shirt").unwrap();
        assert!(shirt.gender_required);
        assert_eq!(catalog::get_product_variants(&conn, shirt.id).unwrap().len(), 4);
        assert_eq!(promo::get_active_promo_codes(&conn).unwrap().len(), 1);
    }
}
