//! # Checkout Error Types
//!
//! The error taxonomy surfaced to the cashier-facing layer. The kinds
//! matter: `InsufficientPayment` means "ask for more cash" while
//! `PaymentDeclined` means "ask for another card" - collapsing them would
//! leave the cashier guessing.

use thiserror::Error;

use mercato_db::{DbError, StockError};

/// Errors from `complete_sale` and `process_return`.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Payment was initiated on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cash tendered does not cover the total.
    #[error("Insufficient payment: total {total_cents}, tendered {tendered_cents}")]
    InsufficientPayment { total_cents: i64, tendered_cents: i64 },

    /// The gateway rejected the charge.
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// The gateway could not be reached or timed out. The only retryable
    /// failure - and even then only with a fresh transaction attempt.
    #[error("Payment gateway unavailable: {reason}")]
    GatewayUnavailable { reason: String },

    /// Offered points (or the live balance) cannot cover the total.
    #[error("Insufficient loyalty points: required {required}, available {available}")]
    InsufficientPoints { required: i64, available: i64 },

    /// Loyalty payment without a customer attached to the cart.
    #[error("Loyalty payment requires a customer on the cart")]
    NoCustomerAttached,

    /// The atomic stock batch lost the race; nothing was decremented and
    /// any gateway authorization has been voided.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    StockExhausted {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Referenced transaction does not exist.
    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: String },

    /// The return request is malformed (wrong status, excess quantity...).
    #[error("Invalid return: {reason}")]
    InvalidReturn { reason: String },

    /// Underlying persistence failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl CheckoutError {
    /// Whether the caller may retry the same request with a fresh
    /// transaction attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::GatewayUnavailable { .. })
    }
}

impl From<StockError> for CheckoutError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Exhausted {
                product_id,
                available,
                requested,
            } => CheckoutError::StockExhausted {
                product_id,
                available,
                requested,
            },
            StockError::Db(e) => CheckoutError::Db(e),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_gateway_unavailable_is_retryable() {
        assert!(CheckoutError::GatewayUnavailable {
            reason: "timeout".to_string()
        }
        .is_retryable());

        assert!(!CheckoutError::PaymentDeclined {
            reason: "card expired".to_string()
        }
        .is_retryable());
        assert!(!CheckoutError::EmptyCart.is_retryable());
        assert!(!CheckoutError::StockExhausted {
            product_id: "p".to_string(),
            available: 0,
            requested: 1,
        }
        .is_retryable());
    }
}
