//! # Error Types
//!
//! Domain-specific error types for mercato-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mercato-core errors (this file)                                        │
//! │  ├── CartError        - Cart mutation misuse, recovered locally         │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  mercato-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── StockError       - Atomic stock mutation failures                  │
//! │                                                                         │
//! │  mercato-engine errors (separate crate)                                 │
//! │  └── CheckoutError    - Payment failures surfaced to the cashier        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, quantities)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Cart Error
// =============================================================================

/// Cart mutation errors.
///
/// These are recovered locally by the caller (the cashier UI re-prompts);
/// they never abort a sale on their own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Resulting quantity would be non-positive, exceed the per-item cap, or
    /// exceed the product's cached stock (advisory check, see the stock
    /// repository for the authoritative one).
    #[error("Invalid quantity {requested} for product {product_id}")]
    InvalidQuantity { product_id: String, requested: i64 },

    /// The product has no line in the cart.
    #[error("Product {product_id} is not in the cart")]
    NotInCart { product_id: String },

    /// Cart has reached the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} items")]
    CartFull { max: usize },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when input doesn't meet shape requirements, before any
/// business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, non-numeric barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for validation results.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
