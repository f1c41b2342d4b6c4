//! # Domain Types
//!
//! Core domain types used throughout Mercato POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    Product      │   │   Transaction    │   │  StockMovement   │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  id (UUID)       │     │
//! │  │  barcode        │   │  receipt_number  │   │  product_id (FK) │     │
//! │  │  price_cents    │   │  status          │   │  quantity_delta  │     │
//! │  │  current_stock  │   │  total_cents     │   │  movement_type   │     │
//! │  └─────────────────┘   └──────────────────┘   └──────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │    TaxRate      │   │  PaymentStatus   │   │  PaymentMethod   │     │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │     │
//! │  │  bps (u32)      │   │  Pending         │   │  Cash            │     │
//! │  │  825 = 8.25%    │   │  Completed       │   │  Card / Mobile   │     │
//! │  └─────────────────┘   │  Failed          │   │  LoyaltyPoints   │     │
//! │                        └──────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (barcode, receipt_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25% (e.g., Texas sales tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Price and metadata are owned by catalog administration; `current_stock`
/// is a cached read model mutated only through the stock repository, which
/// keeps it consistent with the stock-movement ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Barcode (EAN-13, UPC-A, etc.). Unique when present.
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Optional category label, used as a search filter.
    pub category: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// Standing per-product discount in basis points (1000 = 10% off).
    pub discount_bps: u32,

    /// Tax rate in basis points (825 = 8.25%).
    pub tax_rate_bps: u32,

    /// Cached stock level. Never negative.
    pub current_stock: i64,

    /// Stock threshold below which restocking should be triggered.
    pub reorder_level: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Advisory stock check used when adding to a cart.
    ///
    /// The authoritative check happens atomically with the decrement at
    /// payment time; this one only exists so the cashier gets an early hint.
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity > 0 && self.current_stock >= quantity
    }

    /// Whether the cached stock has fallen to or below the reorder level.
    #[inline]
    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_level
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with a loyalty-point balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Loyalty balance. 100 points = $1.00.
    pub loyalty_points: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Status
// =============================================================================

/// The status of a transaction.
///
/// `Pending → {Completed, Failed}`; both outcomes are terminal. A failed
/// payment is retried by starting a new transaction, never by mutating the
/// failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Payment has been initiated but not settled.
    Pending,
    /// Payment settled; the transaction is immutable from here on.
    Completed,
    /// Payment failed; terminal.
    Failed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// The closed set of supported payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment through the card gateway.
    Card,
    /// Mobile wallet payment through the mobile gateway.
    Mobile,
    /// Loyalty-point redemption (requires an attached customer).
    LoyaltyPoints,
}

// =============================================================================
// Movement Type
// =============================================================================

/// The kind of stock movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Sale,
    Return,
    Adjustment,
    Waste,
    Purchase,
}

// =============================================================================
// Transaction
// =============================================================================

/// A completed, failed, or in-flight sale.
///
/// Created when payment is initiated, immutable once `Completed`. A return
/// is a *new* transaction with `is_return = true` and a back-reference; the
/// original is never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub receipt_number: String,
    pub customer_id: Option<String>,
    pub status: PaymentStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    /// Cart-level promotion that was applied, if any.
    pub applied_promotion_id: Option<String>,
    pub is_return: bool,
    pub original_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Returns the aggregated discount as Money.
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// Returns the tax amount as Money.
    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }
}

// =============================================================================
// Transaction Line
// =============================================================================

/// A line item in a transaction.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionLine {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold. Negative on return transactions.
    pub quantity: i64,
    /// Line-level discount applied.
    pub discount_cents: i64,
    /// Tax for this line.
    pub tax_cents: i64,
    /// unit_price × quantity − discount.
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl TransactionLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// An entry in the append-only stock ledger.
///
/// Current stock is derivable as the running sum of deltas; the cached
/// `Product::current_stock` must stay consistent with this ledger, which the
/// stock repository guarantees by writing both in one database transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    /// Signed change: negative for sales/waste, positive for returns/purchases.
    pub quantity_delta: i64,
    pub movement_type: MovementType,
    /// The transaction that triggered the movement, when there is one.
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Promotion
// =============================================================================

/// A cart-level promotion.
///
/// Promotions compete: at most one applies per sale, the one with the
/// largest customer benefit, ties broken by earliest `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: String,
    pub name: String,
    pub kind: PromotionKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The closed set of promotion mechanics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PromotionKind {
    /// Percentage off the net subtotal.
    Percentage { rate_bps: u32 },
    /// Fixed amount off, capped at the net subtotal.
    FixedAmount { amount_cents: i64 },
    /// Buy one get one: every second unit of the product is free.
    Bogo { product_id: String },
    /// Percentage off once the net subtotal reaches a threshold.
    BulkThreshold {
        min_subtotal_cents: i64,
        rate_bps: u32,
    },
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        let rate = TaxRate::from_percentage(8.25);
        assert_eq!(rate.bps(), 825);
    }

    #[test]
    fn test_payment_status_default() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_can_sell_is_advisory_stock_check() {
        let product = Product {
            id: "p1".to_string(),
            barcode: None,
            name: "Apples".to_string(),
            description: None,
            category: None,
            price_cents: 250,
            cost_cents: None,
            discount_bps: 0,
            tax_rate_bps: 0,
            current_stock: 3,
            reorder_level: 5,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(product.can_sell(3));
        assert!(!product.can_sell(4));
        assert!(!product.can_sell(0));
        assert!(product.needs_reorder());
    }
}
