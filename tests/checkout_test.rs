//! Integration tests for the checkout conversation
//!
//! Run with: cargo test --test checkout_test

mod common;

use common::{FakeResolver, TestEnvironment};
use merchbot::checkout::{Checkout, CheckoutReply};
use merchbot::core::types::OrderStatus;
use merchbot::delivery::{DisabledResolver, PickupPointResolver};
use merchbot::shop::{AddOutcome, Shop};
use merchbot::storage::{cart, catalog, orders};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

const USER: i64 = 1001;
const PROOF: &str = "tg-file:AgACAgIAAxkBAAI";

fn rub(amount: i64) -> Decimal {
    Decimal::new(amount, 0)
}

/// Shirt 1500 and cap 800 in the cart of [`USER`]
fn env_with_cart() -> TestEnvironment {
    let env = TestEnvironment::new();
    env.register(USER);
    let shirt = env.product("FATRACING T-Shirt", 1500);
    let cap = env.product("Cycling Cap", 800);
    env.add_to_cart(USER, shirt, 1);
    env.add_to_cart(USER, cap, 1);
    env
}

fn free_text(env: &TestEnvironment) -> Checkout<DisabledResolver> {
    Checkout::new(env.db_pool.clone(), DisabledResolver, false)
}

fn with_lookup<R: PickupPointResolver>(env: &TestEnvironment, resolver: R) -> Checkout<R> {
    Checkout::new(env.db_pool.clone(), resolver, true)
}

/// Walks the free-text flow up to the payment instructions
async fn reach_payment(checkout: &Checkout<DisabledResolver>) -> CheckoutReply {
    assert_eq!(checkout.start(USER).await, CheckoutReply::AskName);
    assert_eq!(checkout.handle_text(USER, "Ivan").await, CheckoutReply::AskPhone);
    assert_eq!(
        checkout.handle_text(USER, "+79990000000").await,
        CheckoutReply::AskPickupAddress
    );
    assert_eq!(
        checkout.handle_text(USER, "Moscow, Tverskaya 1").await,
        CheckoutReply::AskComment { reused: None }
    );
    checkout.skip_comment(USER).await
}

#[tokio::test]
async fn test_free_text_checkout_creates_order() {
    let env = env_with_cart();
    let checkout = free_text(&env);

    assert_eq!(
        reach_payment(&checkout).await,
        CheckoutReply::PaymentInstructions { total: rub(2300) }
    );
    assert!(checkout.awaiting_photo(USER).await);

    // text instead of a screenshot only repeats the reminder
    assert_eq!(checkout.handle_text(USER, "paid!").await, CheckoutReply::PhotoRequired);

    let reply = checkout.handle_photo(USER, PROOF).await;
    let CheckoutReply::OrderCreated { order_id, total } = reply else {
        panic!("expected an order, got {:?}", reply);
    };
    assert_eq!(total, rub(2300));
    assert!(!checkout.is_active(USER).await);

    let conn = env.conn();
    let order = orders::get_order_by_id(&conn, order_id).unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.customer_name.as_deref(), Some("Ivan"));
    assert_eq!(order.phone.as_deref(), Some("+79990000000"));
    assert_eq!(order.city_country.as_deref(), Some("Moscow, Tverskaya 1"));
    // the address has its own columns and is not repeated as a comment
    assert_eq!(order.comment, None);
    assert_eq!(order.delivery_pickup_address.as_deref(), Some("Moscow, Tverskaya 1"));
    assert_eq!(order.payment_proof_url.as_deref(), Some(PROOF));
    assert!(!order.payment_confirmed);

    let items = orders::get_order_items(&conn, order_id).unwrap();
    assert_eq!(items.len(), 2);
    let items_total: Decimal = items.iter().map(|i| i.line_total()).sum();
    assert_eq!(items_total, order.total_amount);
    assert!(cart::is_cart_empty(&conn, USER).unwrap());
}

#[tokio::test]
async fn test_total_is_recomputed_when_order_is_created() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    assert_eq!(
        reach_payment(&checkout).await,
        CheckoutReply::PaymentInstructions { total: rub(2300) }
    );

    let shirt = catalog::get_active_products(&env.conn())
        .unwrap()
        .into_iter()
        .find(|p| p.name == "FATRACING T-Shirt")
        .unwrap();
    catalog::set_product_price(&env.conn(), shirt.id, rub(1700)).unwrap();

    let reply = checkout.handle_photo(USER, PROOF).await;
    assert!(matches!(reply, CheckoutReply::OrderCreated { total, .. } if total == rub(2500)));
}

#[tokio::test]
async fn test_empty_cart_is_rejected_at_start() {
    let env = TestEnvironment::new();
    env.register(USER);
    let checkout = free_text(&env);

    assert_eq!(checkout.start(USER).await, CheckoutReply::CartEmpty);
    assert!(!checkout.is_active(USER).await);
}

#[tokio::test]
async fn test_cart_emptied_mid_flow_discards_draft() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    checkout.start(USER).await;
    checkout.handle_text(USER, "Ivan").await;

    cart::clear_cart(&env.conn(), USER).unwrap();

    assert_eq!(
        checkout.handle_text(USER, "+79990000000").await,
        CheckoutReply::CartEmpty
    );
    assert!(!checkout.is_active(USER).await);
    assert_eq!(checkout.handle_text(USER, "hello").await, CheckoutReply::Ignored);
}

#[tokio::test]
async fn test_photo_after_cart_emptied_creates_nothing() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    reach_payment(&checkout).await;

    cart::clear_cart(&env.conn(), USER).unwrap();

    assert_eq!(checkout.handle_photo(USER, PROOF).await, CheckoutReply::CartEmpty);
    assert!(orders::get_latest_order_for_user(&env.conn(), USER)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cancel_only_from_late_steps_and_keeps_cart() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    checkout.start(USER).await;

    // the cancel button is not offered before the comment step
    assert_eq!(checkout.cancel(USER).await, CheckoutReply::Ignored);
    assert!(checkout.is_active(USER).await);

    checkout.handle_text(USER, "Ivan").await;
    checkout.handle_text(USER, "+79990000000").await;
    checkout.handle_text(USER, "Moscow, Tverskaya 1").await;
    assert_eq!(checkout.cancel(USER).await, CheckoutReply::Cancelled);
    assert!(!checkout.is_active(USER).await);

    assert_eq!(cart::get_cart_items(&env.conn(), USER).unwrap().len(), 2);
}

#[tokio::test]
async fn test_abort_drops_draft_at_any_step() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    checkout.start(USER).await;

    assert!(checkout.abort(USER).await);
    assert!(!checkout.abort(USER).await);
    assert_eq!(checkout.skip_comment(USER).await, CheckoutReply::Ignored);
}

#[tokio::test]
async fn test_previous_contact_is_reused() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    reach_payment(&checkout).await;
    checkout.handle_photo(USER, PROOF).await;

    let bottle = env.product("Water Bottle", 600);
    env.add_to_cart(USER, bottle, 1);

    let CheckoutReply::AskComment { reused: Some(contact) } = checkout.start(USER).await else {
        panic!("expected the previous contact to be reused");
    };
    assert_eq!(contact.name, "Ivan");
    assert_eq!(contact.phone.as_deref(), Some("+79990000000"));
    assert_eq!(contact.pickup_label.as_deref(), Some("Moscow, Tverskaya 1"));

    assert_eq!(
        checkout.handle_text(USER, "Ring twice").await,
        CheckoutReply::PaymentInstructions { total: rub(600) }
    );
    let CheckoutReply::OrderCreated { order_id, .. } = checkout.handle_photo(USER, PROOF).await else {
        panic!("expected an order");
    };
    let order = orders::get_order_by_id(&env.conn(), order_id).unwrap().unwrap();
    assert_eq!(order.comment.as_deref(), Some("Moscow, Tverskaya 1\nRing twice"));
    assert_eq!(orders::count_orders_for_user(&env.conn(), USER).unwrap(), 2);
}

#[tokio::test]
async fn test_no_comment_word_counts_as_empty() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    checkout.start(USER).await;
    checkout.handle_text(USER, "Ivan").await;
    checkout.handle_text(USER, "+79990000000").await;
    checkout.handle_text(USER, "Moscow, Tverskaya 1").await;
    assert!(matches!(
        checkout.handle_text(USER, "нет").await,
        CheckoutReply::PaymentInstructions { .. }
    ));

    let CheckoutReply::OrderCreated { order_id, .. } = checkout.handle_photo(USER, PROOF).await else {
        panic!("expected an order");
    };
    let order = orders::get_order_by_id(&env.conn(), order_id).unwrap().unwrap();
    assert_eq!(order.comment, None);
}

#[tokio::test]
async fn test_lookup_flow_picks_city_and_pickup_point() {
    let env = env_with_cart();
    let checkout = with_lookup(&env, FakeResolver::moscow());

    assert_eq!(checkout.start(USER).await, CheckoutReply::AskName);
    assert_eq!(checkout.handle_text(USER, "Ivan").await, CheckoutReply::AskCity);
    assert_eq!(
        checkout.handle_text(USER, "Moscow").await,
        CheckoutReply::ChooseCity {
            typed: "Moscow".to_string(),
            options: vec!["Москва".to_string(), "Московская область".to_string()],
        }
    );
    assert_eq!(
        checkout.choose_city(USER, Some(0)).await,
        CheckoutReply::AskStreet {
            city: "Москва".to_string()
        }
    );
    assert_eq!(
        checkout.handle_text(USER, "Тверская").await,
        CheckoutReply::ChoosePickupPoint {
            options: vec!["ПВЗ, Москва, Тверская 1".to_string()],
        }
    );
    assert_eq!(
        checkout.choose_pickup_point(USER, Some(0)).await,
        CheckoutReply::AskComment { reused: None }
    );
    assert_eq!(
        checkout.skip_comment(USER).await,
        CheckoutReply::PaymentInstructions { total: rub(2300) }
    );

    let CheckoutReply::OrderCreated { order_id, .. } = checkout.handle_photo(USER, PROOF).await else {
        panic!("expected an order");
    };
    let order = orders::get_order_by_id(&env.conn(), order_id).unwrap().unwrap();
    assert_eq!(order.city_country.as_deref(), Some("Москва"));
    assert_eq!(order.delivery_geo_id, Some(213));
    assert_eq!(order.delivery_pickup_id.as_deref(), Some("pvz-1"));
    assert_eq!(order.delivery_pickup_address.as_deref(), Some("ПВЗ, Москва, Тверская 1"));
    assert_eq!(order.phone, None);
}

#[tokio::test]
async fn test_unknown_city_keeps_typed_text() {
    let env = env_with_cart();
    let checkout = with_lookup(&env, FakeResolver::moscow());
    checkout.start(USER).await;
    checkout.handle_text(USER, "Ivan").await;

    assert_eq!(
        checkout.handle_text(USER, "Нигдеград").await,
        CheckoutReply::AskComment { reused: None }
    );
    checkout.skip_comment(USER).await;
    let CheckoutReply::OrderCreated { order_id, .. } = checkout.handle_photo(USER, PROOF).await else {
        panic!("expected an order");
    };
    let order = orders::get_order_by_id(&env.conn(), order_id).unwrap().unwrap();
    assert_eq!(order.city_country.as_deref(), Some("Нигдеград"));
    assert_eq!(order.delivery_geo_id, None);
    assert_eq!(order.delivery_pickup_id, None);
}

#[tokio::test]
async fn test_keep_typed_city_and_skip_missing_pickup_point() {
    let env = env_with_cart();
    let checkout = with_lookup(&env, FakeResolver::moscow());
    checkout.start(USER).await;
    checkout.handle_text(USER, "Ivan").await;
    checkout.handle_text(USER, "moscow").await;

    assert_eq!(
        checkout.choose_city(USER, None).await,
        CheckoutReply::AskStreet {
            city: "moscow".to_string()
        }
    );
    assert_eq!(
        checkout.handle_text(USER, "Ленинский").await,
        CheckoutReply::NoPickupPoints {
            city: "moscow".to_string()
        }
    );
    // a stale city button does nothing once the street step is reached
    assert_eq!(checkout.choose_city(USER, Some(1)).await, CheckoutReply::Ignored);
    assert_eq!(
        checkout.choose_pickup_point(USER, None).await,
        CheckoutReply::AskComment { reused: None }
    );

    checkout.skip_comment(USER).await;
    let CheckoutReply::OrderCreated { order_id, .. } = checkout.handle_photo(USER, PROOF).await else {
        panic!("expected an order");
    };
    let order = orders::get_order_by_id(&env.conn(), order_id).unwrap().unwrap();
    assert_eq!(order.city_country.as_deref(), Some("moscow"));
    assert_eq!(order.delivery_geo_id, Some(213));
    assert_eq!(order.delivery_pickup_id, None);
}

#[tokio::test]
async fn test_out_of_range_choice_repeats_options() {
    let env = env_with_cart();
    let checkout = with_lookup(&env, FakeResolver::moscow());
    checkout.start(USER).await;
    checkout.handle_text(USER, "Ivan").await;
    checkout.handle_text(USER, "Moscow").await;

    assert!(matches!(
        checkout.choose_city(USER, Some(9)).await,
        CheckoutReply::ChooseCity { options, .. } if options.len() == 2
    ));
}

#[tokio::test]
async fn test_unavailable_resolver_falls_back_to_comment() {
    let env = env_with_cart();
    let checkout = with_lookup(&env, FakeResolver::unavailable());
    checkout.start(USER).await;
    checkout.handle_text(USER, "Ivan").await;

    assert_eq!(
        checkout.handle_text(USER, "Moscow").await,
        CheckoutReply::AskComment { reused: None }
    );
    assert!(matches!(
        checkout.skip_comment(USER).await,
        CheckoutReply::PaymentInstructions { .. }
    ));
}

#[tokio::test]
async fn test_choices_without_checkout_are_ignored() {
    let env = env_with_cart();
    let checkout = with_lookup(&env, FakeResolver::moscow());

    assert_eq!(checkout.choose_city(USER, Some(0)).await, CheckoutReply::Ignored);
    assert_eq!(checkout.choose_pickup_point(USER, None).await, CheckoutReply::Ignored);
    assert_eq!(checkout.handle_photo(USER, PROOF).await, CheckoutReply::Ignored);
    assert_eq!(checkout.cancel(USER).await, CheckoutReply::Ignored);
}

#[tokio::test]
async fn test_selected_variant_reaches_the_order() {
    let env = TestEnvironment::new();
    env.register(USER);
    let shirt = env.product("FATRACING T-Shirt", 1500);
    catalog::insert_variant(&env.conn(), shirt, "S", 4).unwrap();
    let size_m = catalog::insert_variant(&env.conn(), shirt, "M", 4).unwrap();
    let shop = Shop::new(env.db_pool.clone());

    assert_eq!(
        shop.add(USER, shirt, None, None).await.unwrap(),
        AddOutcome::NeedVariant { product_id: shirt }
    );
    assert!(matches!(
        shop.add(USER, shirt, Some(size_m), None).await.unwrap(),
        AddOutcome::Added { .. }
    ));

    let checkout = free_text(&env);
    assert_eq!(
        reach_payment(&checkout).await,
        CheckoutReply::PaymentInstructions { total: rub(1500) }
    );
    let CheckoutReply::OrderCreated { order_id, total } = checkout.handle_photo(USER, PROOF).await else {
        panic!("expected an order");
    };
    assert_eq!(total, rub(1500));

    let items = orders::get_order_items(&env.conn(), order_id).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].variant_id, Some(size_m));
    assert_eq!(items[0].variant_name.as_deref(), Some("M"));
    assert_eq!(items[0].quantity, 1);
    assert_eq!(items[0].price_per_unit, rub(1500));
}

#[tokio::test]
async fn test_failed_commit_discards_draft_and_keeps_cart() {
    let env = env_with_cart();
    let checkout = free_text(&env);
    reach_payment(&checkout).await;

    // the header insert succeeds, the item insert aborts the transaction
    env.conn()
        .execute_batch(
            "CREATE TRIGGER reject_order_items BEFORE INSERT ON order_items
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
        )
        .unwrap();

    assert_eq!(checkout.handle_photo(USER, PROOF).await, CheckoutReply::Failed);
    assert!(!checkout.is_active(USER).await);

    let conn = env.conn();
    assert_eq!(cart::get_cart_items(&conn, USER).unwrap().len(), 2);
    let headers: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0)).unwrap();
    assert_eq!(headers, 0);
    assert_eq!(checkout.handle_photo(USER, PROOF).await, CheckoutReply::Ignored);
}

#[tokio::test]
async fn test_unsupported_message_repeats_current_prompt() {
    let env = env_with_cart();
    let checkout = free_text(&env);

    assert_eq!(checkout.handle_unsupported(USER).await, CheckoutReply::Ignored);

    checkout.start(USER).await;
    assert_eq!(checkout.handle_unsupported(USER).await, CheckoutReply::AskName);

    checkout.abort(USER).await;
    reach_payment(&checkout).await;
    // a document or a sticker instead of the screenshot
    assert_eq!(checkout.handle_unsupported(USER).await, CheckoutReply::PhotoRequired);
    assert!(checkout.awaiting_photo(USER).await);
}
