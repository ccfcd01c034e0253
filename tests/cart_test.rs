//! Integration tests for the add-to-cart flow and the cart itself
//!
//! Run with: cargo test --test cart_test

mod common;

use common::TestEnvironment;
use merchbot::core::types::Gender;
use merchbot::shop::{AddOutcome, AnswerOutcome, Shop};
use merchbot::storage::cart;
use merchbot::storage::catalog::{self, NewProduct};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

const USER: i64 = 2002;

fn shop(env: &TestEnvironment) -> Shop {
    Shop::new(env.db_pool.clone())
}

#[tokio::test]
async fn test_plain_product_lines_merge() {
    let env = TestEnvironment::new();
    env.register(USER);
    let cap = env.product("Cycling Cap", 800);
    let shop = shop(&env);

    let first = shop.add(USER, cap, None, None).await.unwrap();
    let second = shop.add(USER, cap, None, None).await.unwrap();
    let (AddOutcome::Added { line_id: a, .. }, AddOutcome::Added { line_id: b, .. }) = (first, second) else {
        panic!("both adds should land in the cart");
    };
    assert_eq!(a, b);

    let items = cart::get_cart_items(&env.conn(), USER).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(cart::get_cart_total(&env.conn(), USER).unwrap(), Decimal::new(1600, 0));
}

#[tokio::test]
async fn test_variant_and_gender_are_asked_for() {
    let env = TestEnvironment::new();
    env.register(USER);
    let mut shirt = NewProduct::new("FATRACING T-Shirt", Decimal::new(1500, 0));
    shirt.gender_required = true;
    let shirt = env.seed_product(&shirt);
    let size_m = catalog::insert_variant(&env.conn(), shirt, "M", 5).unwrap();
    let shop = shop(&env);

    assert_eq!(
        shop.add(USER, shirt, None, None).await.unwrap(),
        AddOutcome::NeedVariant { product_id: shirt }
    );
    assert_eq!(
        shop.add(USER, shirt, Some(size_m), None).await.unwrap(),
        AddOutcome::NeedGender {
            product_id: shirt,
            variant_id: Some(size_m)
        }
    );
    assert!(matches!(
        shop.add(USER, shirt, Some(size_m), Some(Gender::Female)).await.unwrap(),
        AddOutcome::Added { .. }
    ));

    let items = cart::get_cart_items(&env.conn(), USER).unwrap();
    assert_eq!(items[0].variant_name.as_deref(), Some("M"));
    assert_eq!(items[0].gender, Some(Gender::Female));
}

#[tokio::test]
async fn test_foreign_variant_and_unknown_product_are_unavailable() {
    let env = TestEnvironment::new();
    env.register(USER);
    let shirt = env.product("FATRACING T-Shirt", 1500);
    let cap = env.product("Cycling Cap", 800);
    let cap_variant = catalog::insert_variant(&env.conn(), cap, "One size", 3).unwrap();
    let shop = shop(&env);

    assert_eq!(
        shop.add(USER, shirt, Some(cap_variant), None).await.unwrap(),
        AddOutcome::ProductUnavailable
    );
    assert_eq!(shop.add(USER, 999, None, None).await.unwrap(), AddOutcome::ProductUnavailable);
    assert!(cart::is_cart_empty(&env.conn(), USER).unwrap());
}

#[tokio::test]
async fn test_questions_are_answered_before_adding() {
    let env = TestEnvironment::new();
    env.register(USER);
    let mut jersey = NewProduct::new("Custom Jersey", Decimal::new(4500, 0));
    jersey.questions = vec!["Name on the back?".to_string(), "Number?".to_string()];
    let jersey = env.seed_product(&jersey);
    let shop = shop(&env);

    assert_eq!(
        shop.add(USER, jersey, None, None).await.unwrap(),
        AddOutcome::AskQuestion {
            question: "Name on the back?".to_string(),
            number: 1,
            total: 2
        }
    );
    assert!(shop.is_answering(USER).await);
    assert!(cart::is_cart_empty(&env.conn(), USER).unwrap());

    assert_eq!(
        shop.answer(USER, "IVAN").await.unwrap(),
        AnswerOutcome::Next {
            question: "Number?".to_string(),
            number: 2,
            total: 2
        }
    );
    assert!(matches!(
        shop.answer(USER, "77").await.unwrap(),
        AnswerOutcome::Added { ref product_name, .. } if product_name == "Custom Jersey"
    ));
    assert!(!shop.is_answering(USER).await);
    assert_eq!(shop.answer(USER, "extra").await.unwrap(), AnswerOutcome::NotActive);

    let items = cart::get_cart_items(&env.conn(), USER).unwrap();
    assert_eq!(items[0].answers, vec!["IVAN".to_string(), "77".to_string()]);
}

#[tokio::test]
async fn test_answered_lines_never_merge() {
    let env = TestEnvironment::new();
    env.register(USER);
    let mut jersey = NewProduct::new("Custom Jersey", Decimal::new(4500, 0));
    jersey.questions = vec!["Name on the back?".to_string()];
    let jersey = env.seed_product(&jersey);
    let shop = shop(&env);

    for name in ["IVAN", "OLGA"] {
        shop.add(USER, jersey, None, None).await.unwrap();
        shop.answer(USER, name).await.unwrap();
    }

    assert_eq!(cart::get_cart_items(&env.conn(), USER).unwrap().len(), 2);
}

#[tokio::test]
async fn test_abort_drops_unanswered_flow() {
    let env = TestEnvironment::new();
    env.register(USER);
    let mut jersey = NewProduct::new("Custom Jersey", Decimal::new(4500, 0));
    jersey.questions = vec!["Name on the back?".to_string()];
    let jersey = env.seed_product(&jersey);
    let shop = shop(&env);

    shop.add(USER, jersey, None, None).await.unwrap();
    assert!(shop.abort(USER).await);
    assert_eq!(shop.answer(USER, "IVAN").await.unwrap(), AnswerOutcome::NotActive);
    assert!(cart::is_cart_empty(&env.conn(), USER).unwrap());
}

#[tokio::test]
async fn test_remove_line_is_scoped_to_owner() {
    let env = TestEnvironment::new();
    env.register(USER);
    env.register(USER + 1);
    let cap = env.product("Cycling Cap", 800);
    let line = env.add_to_cart(USER, cap, 1);

    assert!(!cart::remove_from_cart(&env.conn(), line, USER + 1).unwrap());
    assert!(cart::remove_from_cart(&env.conn(), line, USER).unwrap());
    assert!(cart::is_cart_empty(&env.conn(), USER).unwrap());
}
