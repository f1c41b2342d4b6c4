//! # mercato-core: Pure Business Logic for Mercato POS
//!
//! This crate is the **heart** of Mercato POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Mercato POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  mercato-engine (Checkout)                      │   │
//! │  │    complete_sale, process_return, payment gateways              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mercato-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌─────────┐ ┌────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types   │ │  money  │ │  cart  │ │ pricing │ │ receipt │  │   │
//! │  │   │ Product  │ │  Money  │ │  Cart  │ │ Totals  │ │ Receipt │  │   │
//! │  │   │ Txn, ... │ │ TaxCalc │ │  Line  │ │ Promos  │ │  lines  │  │   │
//! │  │   └──────────┘ └─────────┘ └────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  mercato-db (Database Layer)                    │   │
//! │  │          SQLite repositories, stock ledger, migrations          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Transaction, StockMovement, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - The in-progress sale cart
//! - [`pricing`] - Totals computation and promotion selection
//! - [`receipt`] - Receipt text projection
//! - [`error`] - Domain error types
//! - [`validation`] - Input shape validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod receipt;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mercato_core::Money` instead of
// `use mercato_core::money::Money`

pub use cart::{Cart, CartLine};
pub use error::{CartError, ValidationError};
pub use money::Money;
pub use pricing::{compute_totals, Totals};
pub use receipt::Receipt;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// Prevents runaway carts and keeps receipts printable in one roll.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in a cart.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Upper bound for tax and discount rates, in basis points (100%).
pub const MAX_TAX_RATE_BPS: u32 = 10_000;

/// Loyalty conversion policy: 100 points = $1.00, i.e. one point per cent.
///
/// The points required for a sale are therefore exactly the total in cents.
pub const LOYALTY_POINTS_PER_DOLLAR: i64 = 100;

/// Converts a monetary total into the loyalty points required to cover it.
///
/// ## Example
/// ```rust
/// use mercato_core::{points_required, Money};
///
/// assert_eq!(points_required(Money::from_cents(878)), 878);
/// ```
pub fn points_required(total: Money) -> i64 {
    total.cents() * LOYALTY_POINTS_PER_DOLLAR / 100
}
