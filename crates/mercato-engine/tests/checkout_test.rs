//! End-to-end checkout tests: every payment method, the failure taxonomy,
//! and the stock-vs-charge ordering under concurrency.

mod common;

use std::time::Duration;

use common::*;
use mercato_core::{Cart, MovementType, PaymentMethod, PaymentStatus};
use mercato_engine::{CheckoutEngine, CheckoutError, PaymentRequest};

/// $3.99 × 2 at 10% tax: subtotal $7.98, tax $0.80, total $8.78.
async fn soda_cart(db: &mercato_db::Database) -> (Cart, String) {
    let soda = product("Soda 330ml", 399, 1000, 50);
    seed_product(db, &soda).await;
    let mut cart = Cart::new();
    cart.add_item(&soda, 2).unwrap();
    (cart, soda.id)
}

#[tokio::test]
async fn cash_sale_completes_with_change() {
    let db = test_db().await;
    let engine = engine(&db);
    let (cart, soda_id) = soda_cart(&db).await;

    // $10.00 tendered on an $8.78 total.
    let sale = engine
        .complete_sale(&cart, PaymentRequest::Cash { tendered_cents: 1000 })
        .await
        .unwrap();

    assert_eq!(sale.transaction.status, PaymentStatus::Completed);
    assert_eq!(sale.transaction.subtotal_cents, 798);
    assert_eq!(sale.transaction.tax_cents, 80);
    assert_eq!(sale.transaction.total_cents, 878);
    assert_eq!(sale.transaction.payment_method, PaymentMethod::Cash);
    assert_eq!(sale.change.unwrap().cents(), 122);

    // Stock decremented once, via a single batched call.
    assert_eq!(stock_of(&db, &soda_id).await, 48);
    let ledger = db.stock().movements_for_product(&soda_id).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].quantity_delta, -2);
    assert_eq!(ledger[0].movement_type, MovementType::Sale);
}

#[tokio::test]
async fn insufficient_cash_fails_without_moving_stock() {
    let db = test_db().await;
    let engine = engine(&db);
    let (cart, soda_id) = soda_cart(&db).await;

    let err = engine
        .complete_sale(&cart, PaymentRequest::Cash { tendered_cents: 500 })
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientPayment {
            total_cents,
            tendered_cents,
        } => {
            assert_eq!(total_cents, 878);
            assert_eq!(tendered_cents, 500);
        }
        other => panic!("expected InsufficientPayment, got {:?}", other),
    }

    // No transaction reached Completed; no stock movement was recorded.
    assert_eq!(stock_of(&db, &soda_id).await, 50);
    assert!(db
        .stock()
        .movements_for_product(&soda_id)
        .await
        .unwrap()
        .is_empty());
    let window = db
        .transactions()
        .list_between(
            chrono::Utc::now() - chrono::Duration::hours(1),
            chrono::Utc::now() + chrono::Duration::hours(1),
        )
        .await
        .unwrap();
    assert!(window.iter().all(|t| t.status != PaymentStatus::Completed));
}

#[tokio::test]
async fn empty_cart_is_rejected_before_any_transaction() {
    let db = test_db().await;
    let engine = engine(&db);

    let err = engine
        .complete_sale(&Cart::new(), PaymentRequest::Cash { tendered_cents: 100 })
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));
}

#[tokio::test]
async fn card_sale_charges_exact_total() {
    let db = test_db().await;
    let engine = engine(&db);
    let (cart, soda_id) = soda_cart(&db).await;

    let sale = engine
        .complete_sale(&cart, PaymentRequest::Card { details: card_details() })
        .await
        .unwrap();

    assert_eq!(sale.transaction.status, PaymentStatus::Completed);
    assert_eq!(sale.transaction.payment_method, PaymentMethod::Card);
    assert!(sale.change.is_none());
    assert_eq!(stock_of(&db, &soda_id).await, 48);
}

#[tokio::test]
async fn declined_card_fails_the_transaction() {
    let db = test_db().await;
    let engine = CheckoutEngine::new(
        db.clone(),
        MockGateway::new(GatewayBehavior::Decline("card expired")),
        MockGateway::approving(),
    );
    let (cart, soda_id) = soda_cart(&db).await;

    let err = engine
        .complete_sale(&cart, PaymentRequest::Card { details: card_details() })
        .await
        .unwrap_err();

    match &err {
        CheckoutError::PaymentDeclined { reason } => assert_eq!(reason, "card expired"),
        other => panic!("expected PaymentDeclined, got {:?}", other),
    }
    assert!(!err.is_retryable());
    assert_eq!(stock_of(&db, &soda_id).await, 50);
}

#[tokio::test]
async fn hung_gateway_maps_to_retryable_unavailable() {
    let db = test_db().await;
    let engine = CheckoutEngine::new(
        db.clone(),
        MockGateway::new(GatewayBehavior::Hang),
        MockGateway::approving(),
    )
    .with_gateway_timeout(Duration::from_millis(50));
    let (cart, soda_id) = soda_cart(&db).await;

    let err = engine
        .complete_sale(&cart, PaymentRequest::Card { details: card_details() })
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::GatewayUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(stock_of(&db, &soda_id).await, 50);
}

#[tokio::test]
async fn mobile_uses_its_own_gateway() {
    let db = test_db().await;
    let engine = CheckoutEngine::new(
        db.clone(),
        MockGateway::new(GatewayBehavior::Decline("wrong gateway")),
        MockGateway::approving(),
    );
    let (cart, _) = soda_cart(&db).await;

    let sale = engine
        .complete_sale(&cart, PaymentRequest::Mobile { details: card_details() })
        .await
        .unwrap();
    assert_eq!(sale.transaction.payment_method, PaymentMethod::Mobile);
}

#[tokio::test]
async fn loyalty_deducts_exactly_the_required_points() {
    let db = test_db().await;
    let engine = engine(&db);
    let customer = seed_customer(&db, 1000).await;

    let soda = product("Soda 330ml", 399, 1000, 50);
    seed_product(&db, &soda).await;
    let mut cart = Cart::new();
    cart.add_item(&soda, 2).unwrap();
    cart.attach_customer(&customer.id);

    // Total $8.78 → 878 points required; 900 offered; exactly 878 consumed.
    let sale = engine
        .complete_sale(&cart, PaymentRequest::LoyaltyPoints { points_offered: 900 })
        .await
        .unwrap();

    assert_eq!(sale.transaction.status, PaymentStatus::Completed);
    assert_eq!(
        db.customers()
            .get_loyalty_balance(&customer.id)
            .await
            .unwrap(),
        1000 - 878
    );
}

#[tokio::test]
async fn loyalty_without_customer_is_rejected() {
    let db = test_db().await;
    let engine = engine(&db);
    let (cart, soda_id) = soda_cart(&db).await;

    let err = engine
        .complete_sale(&cart, PaymentRequest::LoyaltyPoints { points_offered: 10_000 })
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::NoCustomerAttached));
    assert_eq!(stock_of(&db, &soda_id).await, 50);
}

#[tokio::test]
async fn loyalty_underoffer_keeps_the_balance() {
    let db = test_db().await;
    let engine = engine(&db);
    let customer = seed_customer(&db, 5000).await;

    let soda = product("Soda 330ml", 399, 1000, 50);
    seed_product(&db, &soda).await;
    let mut cart = Cart::new();
    cart.add_item(&soda, 2).unwrap();
    cart.attach_customer(&customer.id);

    let err = engine
        .complete_sale(&cart, PaymentRequest::LoyaltyPoints { points_offered: 500 })
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientPoints {
            required,
            available,
        } => {
            assert_eq!(required, 878);
            assert_eq!(available, 500);
        }
        other => panic!("expected InsufficientPoints, got {:?}", other),
    }
    assert_eq!(
        db.customers()
            .get_loyalty_balance(&customer.id)
            .await
            .unwrap(),
        5000
    );
}

#[tokio::test]
async fn concurrent_sales_of_last_unit_one_wins_one_voids() {
    let db = test_db().await;
    let engine = engine(&db);

    let last_one = product("Last bottle", 1500, 0, 1);
    seed_product(&db, &last_one).await;

    // Two terminals each carry the last unit - the advisory cart check
    // passes for both; only the atomic reservation decides.
    let mut cart_a = Cart::new();
    cart_a.add_item(&last_one, 1).unwrap();
    let mut cart_b = Cart::new();
    cart_b.add_item(&last_one, 1).unwrap();

    let (a, b) = tokio::join!(
        engine.complete_sale(&cart_a, PaymentRequest::Card { details: card_details() }),
        engine.complete_sale(&cart_b, PaymentRequest::Card { details: card_details() }),
    );

    let (winner, loser) = match (a, b) {
        (Ok(sale), Err(err)) => (sale, err),
        (Err(err), Ok(sale)) => (sale, err),
        (Ok(_), Ok(_)) => panic!("both sales completed for a single unit"),
        (Err(a), Err(b)) => panic!("both sales failed: {:?} / {:?}", a, b),
    };

    assert_eq!(winner.transaction.status, PaymentStatus::Completed);
    assert!(matches!(loser, CheckoutError::StockExhausted { .. }));
    assert_eq!(stock_of(&db, &last_one.id).await, 0);

    // Both charges were authorized; exactly the loser's was voided.
    let card = engine.card_gateway();
    assert_eq!(card.charge_count(), 2);
    let voided = card.voided();
    assert_eq!(voided.len(), 1);
    assert!(card.charges.lock().unwrap().contains(&voided[0]));
}

#[tokio::test]
async fn promotion_is_applied_and_recorded() {
    use chrono::{Duration as ChronoDuration, Utc};
    use mercato_core::{Promotion, PromotionKind};

    let db = test_db().await;
    let engine = engine(&db);
    let (cart, _) = soda_cart(&db).await;

    db.promotions()
        .insert(&Promotion {
            id: "promo-10".to_string(),
            name: "10% off everything".to_string(),
            kind: PromotionKind::Percentage { rate_bps: 1000 },
            starts_at: Utc::now() - ChronoDuration::days(1),
            ends_at: None,
            is_active: true,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

    let sale = engine
        .complete_sale(&cart, PaymentRequest::Cash { tendered_cents: 1000 })
        .await
        .unwrap();

    // Net subtotal $7.98 → promotion $0.80 off; total $7.98. Tax still $0.80.
    assert_eq!(sale.transaction.discount_cents, 80);
    assert_eq!(sale.transaction.total_cents, 798);
    assert_eq!(
        sale.transaction.applied_promotion_id.as_deref(),
        Some("promo-10")
    );
}

#[tokio::test]
async fn receipt_reproduces_the_frozen_cart() {
    let db = test_db().await;
    let engine = engine(&db);
    let (cart, _) = soda_cart(&db).await;
    let frozen = cart.lines();

    let sale = engine
        .complete_sale(&cart, PaymentRequest::Cash { tendered_cents: 1000 })
        .await
        .unwrap();

    let text: Vec<String> = sale.receipt("Corner Grocery").render().collect();
    for line in &frozen {
        assert!(text.iter().any(|t| t == &line.name));
        assert!(text
            .iter()
            .any(|t| t.contains(&format!("{} x", line.quantity))));
    }
    assert!(text.iter().any(|t| t.contains("TOTAL: $8.78")));
    assert!(text.iter().any(|t| t.contains("Tendered: $10.00")));
    assert!(text.iter().any(|t| t.contains("Change: $1.22")));
}
