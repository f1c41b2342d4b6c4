//! Shared test fixtures: an in-memory store and scripted payment gateways.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use mercato_core::{Customer, Money, Product};
use mercato_db::{Database, DbConfig};
use mercato_engine::{ChargeApproval, CheckoutEngine, GatewayError, PaymentGateway};

/// What a scripted gateway should do with every charge.
#[derive(Debug)]
pub enum GatewayBehavior {
    /// Approve with sequential AUTH-n references.
    Approve,
    /// Reject every charge.
    Decline(&'static str),
    /// Fail every charge with a transport error.
    Unavailable(&'static str),
    /// Never answer; exercises the engine's timeout.
    Hang,
}

/// A scripted gateway that records every charge and void it sees.
#[derive(Debug)]
pub struct MockGateway {
    behavior: GatewayBehavior,
    sequence: AtomicU64,
    pub charges: Mutex<Vec<String>>,
    pub voids: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new(behavior: GatewayBehavior) -> Self {
        MockGateway {
            behavior,
            sequence: AtomicU64::new(0),
            charges: Mutex::new(Vec::new()),
            voids: Mutex::new(Vec::new()),
        }
    }

    pub fn approving() -> Self {
        Self::new(GatewayBehavior::Approve)
    }

    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }

    pub fn voided(&self) -> Vec<String> {
        self.voids.lock().unwrap().clone()
    }
}

impl PaymentGateway for MockGateway {
    async fn charge(&self, _amount: Money, _details: &Value) -> Result<ChargeApproval, GatewayError> {
        match &self.behavior {
            GatewayBehavior::Approve => {
                let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
                let reference = format!("AUTH-{}", n);
                self.charges.lock().unwrap().push(reference.clone());
                Ok(ChargeApproval { reference })
            }
            GatewayBehavior::Decline(reason) => Err(GatewayError::Declined {
                reason: reason.to_string(),
            }),
            GatewayBehavior::Unavailable(reason) => Err(GatewayError::Unavailable {
                reason: reason.to_string(),
            }),
            GatewayBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Err(GatewayError::Unavailable {
                    reason: "hung".to_string(),
                })
            }
        }
    }

    async fn void(&self, reference: &str) -> Result<(), GatewayError> {
        self.voids.lock().unwrap().push(reference.to_string());
        Ok(())
    }
}

/// Opaque card details the way a provider SDK would hand them over.
pub fn card_details() -> Value {
    json!({ "token": "tok_test_visa" })
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

pub async fn test_db() -> Database {
    init_tracing();
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub fn engine(db: &Database) -> CheckoutEngine<MockGateway, MockGateway> {
    CheckoutEngine::new(db.clone(), MockGateway::approving(), MockGateway::approving())
}

pub fn product(name: &str, price_cents: i64, tax_rate_bps: u32, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        barcode: None,
        name: name.to_string(),
        description: None,
        category: None,
        price_cents,
        cost_cents: None,
        discount_bps: 0,
        tax_rate_bps,
        current_stock: stock,
        reorder_level: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub async fn seed_product(db: &Database, p: &Product) {
    db.products().insert(p).await.unwrap();
}

pub async fn seed_customer(db: &Database, points: i64) -> Customer {
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: "Dana Shopper".to_string(),
        email: None,
        loyalty_points: points,
        is_active: true,
        created_at: Utc::now(),
    };
    db.customers().insert(&customer).await.unwrap();
    customer
}

/// Current cached stock for a product.
pub async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get_by_id(product_id)
        .await
        .unwrap()
        .unwrap()
        .current_stock
}
