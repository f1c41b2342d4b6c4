//! # Checkout Engine
//!
//! Orchestrates one sale from cart to completed transaction, and returns
//! back out of it.
//!
//! ## The Ordering Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Never charge for stock that cannot be fulfilled              │
//! │                                                                         │
//! │  Cash:      validate tender ──► reserve stock ──► complete              │
//! │                                                                         │
//! │  Card:      authorize (voidable) ──► reserve stock ──► complete         │
//! │  Mobile:                │                  │                            │
//! │                         │                  └── lost the race?           │
//! │                         │                      void authorization,      │
//! │                         │                      fail transaction         │
//! │                         └── declined/timeout? fail transaction          │
//! │                                                                         │
//! │  Loyalty:   deduct points (creditable) ──► reserve stock ──► complete   │
//! │                                                │                        │
//! │                                                └── lost the race?       │
//! │                                                    credit points back   │
//! │                                                                         │
//! │  Stock reservation is the atomic guarded batch in the stock             │
//! │  repository; nothing irreversible ever happens before it succeeds.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The add-to-cart stock check is advisory; the reservation here is the
//! authoritative one, which is why two terminals can both carry the last
//! unit in their carts but only one `complete_sale` wins.

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::CheckoutError;
use crate::gateway::{ChargeApproval, GatewayError, PaymentGateway};
use mercato_core::{
    compute_totals, points_required, Cart, Money, PaymentMethod, PaymentStatus, Receipt, Totals,
    Transaction, TransactionLine,
};
use mercato_db::Database;

/// Default budget for one gateway round trip.
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(15);

// =============================================================================
// Requests & Results
// =============================================================================

/// One payment attempt, exactly one method.
///
/// The closed method set maps to a closed enum; there is deliberately no
/// plugin registry for payment handlers.
#[derive(Debug, Clone)]
pub enum PaymentRequest {
    /// Cash with the amount the customer handed over.
    Cash { tendered_cents: i64 },
    /// Card with provider-opaque details.
    Card { details: Value },
    /// Mobile wallet with provider-opaque details.
    Mobile { details: Value },
    /// Loyalty points put forward by the customer.
    LoyaltyPoints { points_offered: i64 },
}

impl PaymentRequest {
    /// The payment method recorded on the transaction.
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentRequest::Cash { .. } => PaymentMethod::Cash,
            PaymentRequest::Card { .. } => PaymentMethod::Card,
            PaymentRequest::Mobile { .. } => PaymentMethod::Mobile,
            PaymentRequest::LoyaltyPoints { .. } => PaymentMethod::LoyaltyPoints,
        }
    }
}

/// A line of a return request: which product, how many units back.
#[derive(Debug, Clone)]
pub struct ReturnLine {
    pub product_id: String,
    pub quantity: i64,
}

/// The outcome of a successful sale.
#[derive(Debug, Clone)]
pub struct CompletedSale {
    /// The completed, now-immutable transaction record.
    pub transaction: Transaction,
    /// The frozen line snapshots, in cart order.
    pub lines: Vec<TransactionLine>,
    /// Change due on cash payments. Ephemeral - for the receipt only,
    /// never persisted on the transaction.
    pub change: Option<Money>,
}

impl CompletedSale {
    /// Builds the printable receipt view for this sale.
    pub fn receipt<'a>(&'a self, store_name: &'a str) -> Receipt<'a> {
        let receipt = Receipt::new(store_name, &self.transaction, &self.lines);
        match self.change {
            Some(change) => receipt.with_cash(self.transaction.total() + change, change),
            None => receipt,
        }
    }
}

// =============================================================================
// Checkout Engine
// =============================================================================

/// The transaction engine: catalog in, completed transactions out.
///
/// Gateways are injected as explicit collaborators - there are no
/// process-wide singletons, so tests run against scripted gateways and two
/// engines can coexist in one process (Scenario: two terminals).
#[derive(Debug, Clone)]
pub struct CheckoutEngine<C, M> {
    db: Database,
    card_gateway: C,
    mobile_gateway: M,
    gateway_timeout: Duration,
}

impl<C, M> CheckoutEngine<C, M>
where
    C: PaymentGateway,
    M: PaymentGateway,
{
    /// Creates a checkout engine over a database and two gateways.
    pub fn new(db: Database, card_gateway: C, mobile_gateway: M) -> Self {
        CheckoutEngine {
            db,
            card_gateway,
            mobile_gateway,
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    /// Overrides the gateway timeout.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// The injected card gateway.
    pub fn card_gateway(&self) -> &C {
        &self.card_gateway
    }

    /// The injected mobile gateway.
    pub fn mobile_gateway(&self) -> &M {
        &self.mobile_gateway
    }

    // =========================================================================
    // complete_sale
    // =========================================================================

    /// Runs one payment attempt against the cart.
    ///
    /// On success exactly one transaction reaches `Completed` and exactly
    /// one batched stock call was issued. The cart is NOT cleared here -
    /// that is the caller's job once it has handed over the receipt.
    ///
    /// On failure the pending transaction is marked `Failed` (terminal) and
    /// the typed error says what the cashier should do next; retrying means
    /// calling this again, which starts a new transaction.
    pub async fn complete_sale(
        &self,
        cart: &Cart,
        request: PaymentRequest,
    ) -> Result<CompletedSale, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let promotions = self.db.promotions().list_active(Utc::now()).await?;
        let totals = compute_totals(cart, &promotions);
        let total = totals.total();

        let (txn, lines) = freeze_cart(cart, &totals, request.method());
        self.db.transactions().insert(&txn, &lines).await?;

        debug!(
            transaction_id = %txn.id,
            total = %total,
            method = ?request.method(),
            "Payment initiated"
        );

        let change = match &request {
            PaymentRequest::Cash { tendered_cents } => {
                self.settle_cash(&txn, &lines, total, *tendered_cents).await?
            }
            PaymentRequest::Card { details } => {
                self.settle_gateway(&self.card_gateway, &txn, &lines, total, details)
                    .await?
            }
            PaymentRequest::Mobile { details } => {
                self.settle_gateway(&self.mobile_gateway, &txn, &lines, total, details)
                    .await?
            }
            PaymentRequest::LoyaltyPoints { points_offered } => {
                self.settle_loyalty(cart, &txn, &lines, total, *points_offered)
                    .await?
            }
        };

        self.db.transactions().mark_completed(&txn.id).await?;
        let transaction = self
            .db
            .transactions()
            .get_by_id(&txn.id)
            .await?
            .ok_or_else(|| CheckoutError::TransactionNotFound { id: txn.id.clone() })?;

        info!(
            transaction_id = %transaction.id,
            receipt_number = %transaction.receipt_number,
            total = %transaction.total(),
            "Sale completed"
        );

        Ok(CompletedSale {
            transaction,
            lines,
            change,
        })
    }

    /// Cash: sufficient tender, then the stock reservation.
    async fn settle_cash(
        &self,
        txn: &Transaction,
        lines: &[TransactionLine],
        total: Money,
        tendered_cents: i64,
    ) -> Result<Option<Money>, CheckoutError> {
        let tendered = Money::from_cents(tendered_cents);
        if tendered < total {
            return Err(self
                .fail(
                    &txn.id,
                    CheckoutError::InsufficientPayment {
                        total_cents: total.cents(),
                        tendered_cents,
                    },
                )
                .await);
        }

        if let Err(stock_err) = self.db.stock().apply_sale(lines, &txn.id).await {
            return Err(self.fail(&txn.id, stock_err.into()).await);
        }

        Ok(Some(tendered - total))
    }

    /// Card/Mobile: authorize first (voidable), then reserve stock, voiding
    /// the authorization if the stock race is lost. The capture itself is
    /// the provider's settlement of an un-voided authorization, so nothing
    /// irreversible precedes the reservation.
    async fn settle_gateway<G: PaymentGateway>(
        &self,
        gateway: &G,
        txn: &Transaction,
        lines: &[TransactionLine],
        total: Money,
        details: &Value,
    ) -> Result<Option<Money>, CheckoutError> {
        let approval = match self.charge_with_timeout(gateway, total, details).await {
            Ok(approval) => approval,
            Err(GatewayError::Declined { reason }) => {
                return Err(self
                    .fail(&txn.id, CheckoutError::PaymentDeclined { reason })
                    .await);
            }
            Err(GatewayError::Unavailable { reason }) => {
                return Err(self
                    .fail(&txn.id, CheckoutError::GatewayUnavailable { reason })
                    .await);
            }
        };

        debug!(transaction_id = %txn.id, reference = %approval.reference, "Charge authorized");

        if let Err(stock_err) = self.db.stock().apply_sale(lines, &txn.id).await {
            warn!(
                transaction_id = %txn.id,
                reference = %approval.reference,
                "Stock reservation lost after authorization, voiding charge"
            );
            if let Err(void_err) = gateway.void(&approval.reference).await {
                // The customer must not stay charged: surface loudly for
                // manual reconciliation, then still report the stock error.
                error!(
                    transaction_id = %txn.id,
                    reference = %approval.reference,
                    error = %void_err,
                    "Failed to void authorization"
                );
            }
            return Err(self.fail(&txn.id, stock_err.into()).await);
        }

        Ok(None)
    }

    /// Loyalty: identity, offered points, guarded deduction, then stock.
    /// A lost stock race credits the deducted points back.
    async fn settle_loyalty(
        &self,
        cart: &Cart,
        txn: &Transaction,
        lines: &[TransactionLine],
        total: Money,
        points_offered: i64,
    ) -> Result<Option<Money>, CheckoutError> {
        let customer_id = match cart.customer_id() {
            Some(id) => id.to_string(),
            None => return Err(self.fail(&txn.id, CheckoutError::NoCustomerAttached).await),
        };

        let required = points_required(total);
        if points_offered < required {
            return Err(self
                .fail(
                    &txn.id,
                    CheckoutError::InsufficientPoints {
                        required,
                        available: points_offered,
                    },
                )
                .await);
        }

        // Deduct exactly the required points; excess offered points are
        // not consumed. The guarded update loses cleanly if another
        // terminal spent the balance first.
        let deducted = match self.db.customers().try_deduct_points(&customer_id, required).await {
            Ok(deducted) => deducted,
            Err(e) => return Err(self.fail(&txn.id, e.into()).await),
        };
        if !deducted {
            let balance = match self.db.customers().get_loyalty_balance(&customer_id).await {
                Ok(balance) => balance,
                Err(e) => return Err(self.fail(&txn.id, e.into()).await),
            };
            return Err(self
                .fail(
                    &txn.id,
                    CheckoutError::InsufficientPoints {
                        required,
                        available: balance,
                    },
                )
                .await);
        }

        if let Err(stock_err) = self.db.stock().apply_sale(lines, &txn.id).await {
            warn!(
                transaction_id = %txn.id,
                customer_id = %customer_id,
                points = %required,
                "Stock reservation lost after point deduction, crediting back"
            );
            if let Err(credit_err) = self.db.customers().credit_points(&customer_id, required).await
            {
                error!(
                    transaction_id = %txn.id,
                    customer_id = %customer_id,
                    error = %credit_err,
                    "Failed to credit points back"
                );
            }
            return Err(self.fail(&txn.id, stock_err.into()).await);
        }

        Ok(None)
    }

    // =========================================================================
    // process_return
    // =========================================================================

    /// Creates a return transaction against a completed original.
    ///
    /// The return is a *new* transaction (`is_return = true`, negative
    /// amounts, back-reference); the original is never modified. Stock goes
    /// back through the same atomic batch machinery, with return-typed
    /// movements linked to the original transaction.
    pub async fn process_return(
        &self,
        original_transaction_id: &str,
        returned: &[ReturnLine],
    ) -> Result<Transaction, CheckoutError> {
        let original = self
            .db
            .transactions()
            .get_by_id(original_transaction_id)
            .await?
            .ok_or_else(|| CheckoutError::TransactionNotFound {
                id: original_transaction_id.to_string(),
            })?;

        if original.status != PaymentStatus::Completed {
            return Err(invalid_return("original transaction is not completed"));
        }
        if original.is_return {
            return Err(invalid_return("cannot return a return transaction"));
        }
        if returned.is_empty() {
            return Err(invalid_return("no lines to return"));
        }
        for (i, line) in returned.iter().enumerate() {
            if returned[..i].iter().any(|r| r.product_id == line.product_id) {
                return Err(invalid_return("duplicate product in return lines"));
            }
        }

        let original_lines = self
            .db
            .transactions()
            .get_lines(original_transaction_id)
            .await?;

        let now = Utc::now();
        let return_id = Uuid::new_v4().to_string();
        let mut lines = Vec::with_capacity(returned.len());
        let (mut subtotal, mut tax, mut discount) = (0i64, 0i64, 0i64);

        for line in returned {
            if line.quantity <= 0 {
                return Err(invalid_return("returned quantity must be positive"));
            }
            let sold = original_lines
                .iter()
                .find(|l| l.product_id == line.product_id)
                .ok_or_else(|| invalid_return("product was not part of the original sale"))?;
            if line.quantity > sold.quantity {
                return Err(invalid_return("returned quantity exceeds sold quantity"));
            }

            // Allocate the original line's discount and tax to the returned
            // units proportionally (integer floor).
            let discount_alloc = sold.discount_cents * line.quantity / sold.quantity;
            let tax_alloc = sold.tax_cents * line.quantity / sold.quantity;
            let gross = sold.unit_price_cents * line.quantity;

            lines.push(TransactionLine {
                id: Uuid::new_v4().to_string(),
                transaction_id: return_id.clone(),
                product_id: sold.product_id.clone(),
                name_snapshot: sold.name_snapshot.clone(),
                unit_price_cents: sold.unit_price_cents,
                quantity: -line.quantity,
                discount_cents: -discount_alloc,
                tax_cents: -tax_alloc,
                line_total_cents: -(gross - discount_alloc),
                created_at: now,
            });

            subtotal -= gross;
            tax -= tax_alloc;
            discount -= discount_alloc;
        }

        let txn = Transaction {
            id: return_id.clone(),
            receipt_number: generate_receipt_number("RET"),
            customer_id: original.customer_id.clone(),
            status: PaymentStatus::Pending,
            subtotal_cents: subtotal,
            tax_cents: tax,
            discount_cents: discount,
            total_cents: subtotal + tax - discount,
            payment_method: original.payment_method,
            applied_promotion_id: None,
            is_return: true,
            original_transaction_id: Some(original.id.clone()),
            created_at: now,
            completed_at: None,
        };
        self.db.transactions().insert(&txn, &lines).await?;

        let stock_lines: Vec<(String, i64)> = returned
            .iter()
            .map(|r| (r.product_id.clone(), r.quantity))
            .collect();
        if let Err(stock_err) = self
            .db
            .stock()
            .apply_return(&stock_lines, &original.id)
            .await
        {
            return Err(self.fail(&txn.id, stock_err.into()).await);
        }

        self.db.transactions().mark_completed(&txn.id).await?;
        let completed = self
            .db
            .transactions()
            .get_by_id(&txn.id)
            .await?
            .ok_or_else(|| CheckoutError::TransactionNotFound { id: txn.id.clone() })?;

        info!(
            transaction_id = %completed.id,
            original_transaction_id = %original.id,
            refund = %completed.total(),
            "Return processed"
        );

        Ok(completed)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Races a gateway charge against the timeout budget; expiry counts as
    /// the provider being unavailable.
    async fn charge_with_timeout<G: PaymentGateway>(
        &self,
        gateway: &G,
        amount: Money,
        details: &Value,
    ) -> Result<ChargeApproval, GatewayError> {
        match tokio::time::timeout(self.gateway_timeout, gateway.charge(amount, details)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Unavailable {
                reason: format!("charge timed out after {:?}", self.gateway_timeout),
            }),
        }
    }

    /// Marks the transaction failed and hands the error back. A failure to
    /// record the failure is logged, not propagated - the payment error is
    /// the one the cashier needs.
    async fn fail(&self, transaction_id: &str, err: CheckoutError) -> CheckoutError {
        if let Err(db_err) = self.db.transactions().mark_failed(transaction_id).await {
            error!(
                transaction_id = %transaction_id,
                error = %db_err,
                "Could not record payment failure"
            );
        }
        err
    }
}

// =============================================================================
// Freezing
// =============================================================================

/// Freezes the cart into a pending transaction plus line snapshots.
fn freeze_cart(
    cart: &Cart,
    totals: &Totals,
    method: PaymentMethod,
) -> (Transaction, Vec<TransactionLine>) {
    let now = Utc::now();
    let transaction_id = Uuid::new_v4().to_string();

    let lines: Vec<TransactionLine> = cart
        .lines()
        .iter()
        .map(|l| TransactionLine {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.clone(),
            product_id: l.product_id.clone(),
            name_snapshot: l.name.clone(),
            unit_price_cents: l.unit_price_cents,
            quantity: l.quantity,
            discount_cents: l.discount_cents(),
            tax_cents: l.tax_cents(),
            line_total_cents: l.net_cents(),
            created_at: now,
        })
        .collect();

    let transaction = Transaction {
        id: transaction_id,
        receipt_number: generate_receipt_number("TXN"),
        customer_id: cart.customer_id().map(String::from),
        status: PaymentStatus::Pending,
        subtotal_cents: totals.subtotal_cents,
        tax_cents: totals.tax_cents,
        discount_cents: totals.discount_cents,
        total_cents: totals.total_cents,
        payment_method: method,
        applied_promotion_id: totals.applied_promotion_id.clone(),
        is_return: false,
        original_transaction_id: None,
        created_at: now,
        completed_at: None,
    };

    (transaction, lines)
}

/// Generates a receipt number: `TXN-20260806-1a2b3c`.
///
/// Date for the paper trail, a UUID fragment for uniqueness across
/// terminals without a coordinated counter.
fn generate_receipt_number(prefix: &str) -> String {
    let date = Utc::now().format("%Y%m%d");
    let unique = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, date, &unique[..6])
}

fn invalid_return(reason: &str) -> CheckoutError {
    CheckoutError::InvalidReturn {
        reason: reason.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
