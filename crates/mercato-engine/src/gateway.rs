//! # Payment Gateways
//!
//! The seam between the checkout engine and external card/mobile payment
//! providers.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      PaymentGateway                                     │
//! │                                                                         │
//! │  charge(amount, details) ──► ChargeApproval { reference }               │
//! │                          ──► Declined     (provider said no - the       │
//! │                                            cashier asks for another     │
//! │                                            card, NOT a retry)           │
//! │                          ──► Unavailable  (network/timeout - the ONE    │
//! │                                            retryable failure, with a    │
//! │                                            fresh transaction)           │
//! │                                                                         │
//! │  void(reference) ──► reverses an authorization that has not been        │
//! │                      captured; the compensating action when the         │
//! │                      stock race is lost after a charge                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Method details (PAN token, wallet handle...) are opaque JSON: the engine
//! forwards them untouched, exactly like the provider SDK expects, and never
//! inspects or stores them.

use std::future::Future;

use mercato_core::Money;
use serde_json::Value;
use thiserror::Error;

/// A successful authorization from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeApproval {
    /// Provider reference (auth code), needed to void or capture later.
    pub reference: String,
}

/// Gateway failures, split by what the cashier should do next.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The provider rejected the charge. Not retryable with the same input.
    #[error("declined: {reason}")]
    Declined { reason: String },

    /// The provider could not be reached or timed out. The caller may retry
    /// with a fresh transaction attempt.
    #[error("unavailable: {reason}")]
    Unavailable { reason: String },
}

/// An external payment provider.
///
/// Card and Mobile are two implementations of the same trait; the engine is
/// generic over both so dispatch is static and mock gateways in tests are
/// plain structs.
pub trait PaymentGateway: Send + Sync {
    /// Authorizes a charge. Must be cancellable: the engine races it
    /// against a timeout and maps expiry to [`GatewayError::Unavailable`].
    fn charge(
        &self,
        amount: Money,
        details: &Value,
    ) -> impl Future<Output = Result<ChargeApproval, GatewayError>> + Send;

    /// Voids a prior authorization by its reference.
    fn void(&self, reference: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
