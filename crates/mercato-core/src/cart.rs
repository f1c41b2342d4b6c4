//! # Cart
//!
//! The in-memory cart for one in-progress sale.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Operations                                   │
//! │                                                                         │
//! │  Cashier Action            Cart Operation         State Change          │
//! │  ──────────────            ──────────────         ────────────          │
//! │                                                                         │
//! │  Scan barcode ───────────► add_item() ──────────► merge or append      │
//! │                                                                         │
//! │  Change quantity ────────► update_quantity() ───► overwrite or remove  │
//! │                                                                         │
//! │  Remove line ────────────► remove_item() ───────► retain others        │
//! │                                                                         │
//! │  Payment success / ──────► clear() ─────────────► empty cart           │
//! │  explicit cancel                                                        │
//! │                                                                         │
//! │  One cart per terminal, one cashier: access is serialized by the        │
//! │  caller, so the cart itself needs no locking.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding the same product merges)
//! - Every quantity is > 0 (an update to 0 removes the line)
//! - At most `MAX_CART_ITEMS` lines, `MAX_ITEM_QUANTITY` units per line

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One product + quantity entry within a cart.
///
/// ## Price Freezing
/// All pricing inputs (unit price, tax rate, discount rate) are captured at
/// add time. A price change in the catalog mid-transaction does not affect
/// lines already in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID (UUID).
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Barcode at time of adding (frozen).
    pub barcode: Option<String>,

    /// Price in cents at time of adding (frozen).
    pub unit_price_cents: i64,

    /// Tax rate in basis points at time of adding (frozen).
    pub tax_rate_bps: u32,

    /// Per-product discount in basis points at time of adding (frozen).
    pub discount_bps: u32,

    /// Quantity in cart. Always > 0.
    pub quantity: i64,

    /// When this line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a new cart line from a product snapshot and quantity.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            barcode: product.barcode.clone(),
            unit_price_cents: product.price_cents,
            tax_rate_bps: product.tax_rate_bps,
            discount_bps: product.discount_bps,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Gross line amount: unit price × quantity.
    #[inline]
    pub fn gross_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Line-level discount, from the frozen per-product discount rate.
    pub fn discount_cents(&self) -> i64 {
        Money::from_cents(self.gross_cents())
            .mul_bps(self.discount_bps)
            .cents()
    }

    /// Taxable base: gross minus the line discount.
    #[inline]
    pub fn net_cents(&self) -> i64 {
        self.gross_cents() - self.discount_cents()
    }

    /// Tax on the taxable base, rounded half to even.
    pub fn tax_cents(&self) -> i64 {
        Money::from_cents(self.net_cents())
            .calculate_tax(TaxRate::from_bps(self.tax_rate_bps))
            .cents()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The in-progress, mutable collection of selected items for one sale.
///
/// Destroyed (cleared) on successful payment or explicit cancellation; the
/// checkout engine freezes a copy into an immutable transaction and leaves
/// clearing to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            customer_id: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches a customer (required for loyalty-point payments).
    pub fn attach_customer(&mut self, customer_id: impl Into<String>) {
        self.customer_id = Some(customer_id.into());
    }

    /// The attached customer, if any.
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }

    /// Adds a product to the cart, merging with an existing line.
    ///
    /// ## Behavior
    /// - If the product is already in the cart: increases quantity
    /// - Otherwise: appends a new line with a price snapshot taken now
    ///
    /// ## Errors
    /// - `InvalidQuantity` if the resulting quantity would be ≤ 0, exceed
    ///   `MAX_ITEM_QUANTITY`, or exceed the product's cached stock. The stock
    ///   check is advisory; the authoritative one runs at payment time.
    /// - `CartFull` past `MAX_CART_ITEMS` distinct lines.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> Result<(), CartError> {
        let existing_qty = self
            .lines
            .iter()
            .find(|l| l.product_id == product.id)
            .map(|l| l.quantity)
            .unwrap_or(0);
        let new_qty = existing_qty + quantity;

        if new_qty <= 0 || new_qty > MAX_ITEM_QUANTITY || new_qty > product.current_stock {
            return Err(CartError::InvalidQuantity {
                product_id: product.id.clone(),
                requested: new_qty,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CartError::CartFull {
                max: MAX_CART_ITEMS,
            });
        }

        self.lines.push(CartLine::from_product(product, new_qty));
        Ok(())
    }

    /// Overwrites the quantity of a line.
    ///
    /// ## Behavior
    /// - `quantity ≤ 0` removes the line
    /// - Absent product is `NotInCart`
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> Result<(), CartError> {
        if !self.lines.iter().any(|l| l.product_id == product_id) {
            return Err(CartError::NotInCart {
                product_id: product_id.to_string(),
            });
        }

        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CartError::InvalidQuantity {
                product_id: product_id.to_string(),
                requested: quantity,
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Removes a line by product ID. Removing an absent item is a no-op.
    pub fn remove_item(&mut self, product_id: &str) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Clears all lines and detaches the customer.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.customer_id = None;
        self.created_at = Utc::now();
    }

    /// The current ordered snapshot of lines.
    ///
    /// This is a defensive copy: mutating the returned lines has no effect
    /// on the cart.
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.clone()
    }

    /// Iterates the lines without copying (crate-internal).
    pub(crate) fn iter_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter()
    }

    /// Returns the number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
