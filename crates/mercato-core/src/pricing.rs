//! # Pricing Engine
//!
//! Pure computation of sale totals from cart state and active promotions.
//!
//! ## Totals Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       compute_totals()                                  │
//! │                                                                         │
//! │  Cart lines                                                             │
//! │      │                                                                  │
//! │      ├──► subtotal   = Σ unit price × quantity          (gross)         │
//! │      │                                                                  │
//! │      ├──► line disc. = Σ gross × product discount rate                  │
//! │      │                                                                  │
//! │      ├──► tax        = Σ (gross − line disc.) × tax rate  per line,     │
//! │      │                 each rounded half to even                        │
//! │      │                                                                  │
//! │  Promotions ──► best = argmax(benefit), tie → earliest created_at       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  discount = line discounts + best promotion benefit                     │
//! │  total    = subtotal + tax − discount, floored at 0                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No side effects: calling this twice on an unchanged cart yields identical
//! totals. Tax is computed per line with that product's own rate, so a cart
//! can mix tax classes (groceries vs. alcohol) correctly.

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::money::Money;
use crate::types::{Promotion, PromotionKind};

// =============================================================================
// Totals
// =============================================================================

/// The computed money breakdown of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Gross subtotal: Σ unit price × quantity.
    pub subtotal_cents: i64,
    /// Aggregated discount: line-level discounts + applied promotion.
    pub discount_cents: i64,
    /// Tax, summed per line.
    pub tax_cents: i64,
    /// subtotal + tax − discount, never negative.
    pub total_cents: i64,
    /// The winning cart-level promotion, if any.
    pub applied_promotion_id: Option<String>,
}

impl Totals {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    fn empty() -> Self {
        Totals {
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            applied_promotion_id: None,
        }
    }
}

// =============================================================================
// Computation
// =============================================================================

/// Computes the totals for a cart under the given promotions.
///
/// At most one promotion applies: the one yielding the largest customer
/// benefit; ties break by earliest creation time, then input order.
/// An empty cart produces all-zero totals and is not an error.
pub fn compute_totals(cart: &Cart, promotions: &[Promotion]) -> Totals {
    if cart.is_empty() {
        return Totals::empty();
    }

    let subtotal: i64 = cart.iter_lines().map(|l| l.gross_cents()).sum();
    let line_discounts: i64 = cart.iter_lines().map(|l| l.discount_cents()).sum();
    let tax: i64 = cart.iter_lines().map(|l| l.tax_cents()).sum();
    let net_subtotal = subtotal - line_discounts;

    let best = best_promotion(cart, net_subtotal, promotions);
    let promotion_benefit = best.map(|(_, benefit)| benefit).unwrap_or(0);

    let discount = line_discounts + promotion_benefit;
    let total = (subtotal + tax - discount).max(0);

    Totals {
        subtotal_cents: subtotal,
        discount_cents: discount,
        tax_cents: tax,
        total_cents: total,
        applied_promotion_id: best.map(|(p, _)| p.id.clone()),
    }
}

/// Selects the promotion with the largest benefit.
///
/// Candidates are ranked by benefit; on a tie the earlier `created_at` wins,
/// falling back to input order (the strict `>` comparisons keep the first
/// seen winner).
fn best_promotion<'a>(
    cart: &Cart,
    net_subtotal: i64,
    promotions: &'a [Promotion],
) -> Option<(&'a Promotion, i64)> {
    let mut best: Option<(&Promotion, i64)> = None;

    for promo in promotions {
        let benefit = promotion_benefit(cart, net_subtotal, &promo.kind);
        if benefit <= 0 {
            continue;
        }
        best = match best {
            None => Some((promo, benefit)),
            Some((current, current_benefit)) => {
                if benefit > current_benefit
                    || (benefit == current_benefit && promo.created_at < current.created_at)
                {
                    Some((promo, benefit))
                } else {
                    Some((current, current_benefit))
                }
            }
        };
    }

    best
}

/// The customer benefit of one promotion against the current cart, in cents.
/// Zero means the promotion does not apply.
fn promotion_benefit(cart: &Cart, net_subtotal: i64, kind: &PromotionKind) -> i64 {
    match kind {
        PromotionKind::Percentage { rate_bps } => {
            Money::from_cents(net_subtotal).mul_bps(*rate_bps).cents()
        }
        PromotionKind::FixedAmount { amount_cents } => (*amount_cents).min(net_subtotal),
        PromotionKind::Bogo { product_id } => cart
            .iter_lines()
            .find(|l| &l.product_id == product_id)
            .map(|l| (l.quantity / 2) * l.unit_price_cents)
            .unwrap_or(0),
        PromotionKind::BulkThreshold {
            min_subtotal_cents,
            rate_bps,
        } => {
            if net_subtotal >= *min_subtotal_cents {
                Money::from_cents(net_subtotal).mul_bps(*rate_bps).cents()
            } else {
                0
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;
    use chrono::{Duration, Utc};

    fn test_product(id: &str, price_cents: i64, tax_rate_bps: u32) -> Product {
        Product {
            id: id.to_string(),
            barcode: None,
            name: format!("Product {}", id),
            description: None,
            category: None,
            price_cents,
            cost_cents: None,
            discount_bps: 0,
            tax_rate_bps,
            current_stock: 1000,
            reorder_level: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn promo(id: &str, kind: PromotionKind, created_offset_secs: i64) -> Promotion {
        Promotion {
            id: id.to_string(),
            name: format!("Promo {}", id),
            kind,
            starts_at: Utc::now() - Duration::days(1),
            ends_at: None,
            is_active: true,
            created_at: Utc::now() + Duration::seconds(created_offset_secs),
        }
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let cart = Cart::new();
        let totals = compute_totals(&cart, &[]);
        assert_eq!(totals.subtotal_cents, 0);
        assert_eq!(totals.tax_cents, 0);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 0);
        assert!(totals.applied_promotion_id.is_none());
    }

    #[test]
    fn test_single_line_with_tax() {
        // $3.99 × 2 at 10% tax: subtotal $7.98, tax $0.80, total $8.78
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 399, 1000), 2).unwrap();

        let totals = compute_totals(&cart, &[]);
        assert_eq!(totals.subtotal_cents, 798);
        assert_eq!(totals.tax_cents, 80);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.total_cents, 878);
    }

    #[test]
    fn test_mixed_tax_rates_are_per_line() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("food", 1000, 0), 1).unwrap();
        cart.add_item(&test_product("wine", 2000, 2000), 1).unwrap();

        let totals = compute_totals(&cart, &[]);
        assert_eq!(totals.subtotal_cents, 3000);
        assert_eq!(totals.tax_cents, 400); // only the wine is taxed
        assert_eq!(totals.total_cents, 3400);
    }

    #[test]
    fn test_idempotent_on_unchanged_cart() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 399, 1000), 2).unwrap();
        let promos = vec![promo("p", PromotionKind::Percentage { rate_bps: 500 }, 0)];

        let first = compute_totals(&cart, &promos);
        let second = compute_totals(&cart, &promos);
        assert_eq!(first, second);
    }

    #[test]
    fn test_largest_benefit_wins() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10_000, 0), 1).unwrap();

        let promos = vec![
            promo("small", PromotionKind::FixedAmount { amount_cents: 300 }, 0),
            promo("big", PromotionKind::Percentage { rate_bps: 1000 }, 1),
        ];

        let totals = compute_totals(&cart, &promos);
        assert_eq!(totals.applied_promotion_id.as_deref(), Some("big"));
        assert_eq!(totals.discount_cents, 1000);
    }

    #[test]
    fn test_tie_breaks_by_creation_order() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10_000, 0), 1).unwrap();

        // Both yield exactly $5.00; "older" was created first.
        let promos = vec![
            promo("newer", PromotionKind::FixedAmount { amount_cents: 500 }, 10),
            promo("older", PromotionKind::Percentage { rate_bps: 500 }, -10),
        ];

        let totals = compute_totals(&cart, &promos);
        assert_eq!(totals.applied_promotion_id.as_deref(), Some("older"));
    }

    #[test]
    fn test_bogo_gives_every_second_unit_free() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("soda", 250, 0), 5).unwrap();

        let promos = vec![promo(
            "bogo",
            PromotionKind::Bogo {
                product_id: "soda".to_string(),
            },
            0,
        )];

        // 5 units → 2 free
        let totals = compute_totals(&cart, &promos);
        assert_eq!(totals.discount_cents, 500);
        assert_eq!(totals.total_cents, 1250 - 500);
    }

    #[test]
    fn test_bogo_ignores_other_products() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("milk", 300, 0), 2).unwrap();

        let promos = vec![promo(
            "bogo",
            PromotionKind::Bogo {
                product_id: "soda".to_string(),
            },
            0,
        )];

        let totals = compute_totals(&cart, &promos);
        assert_eq!(totals.discount_cents, 0);
        assert!(totals.applied_promotion_id.is_none());
    }

    #[test]
    fn test_bulk_threshold_only_past_minimum() {
        let kind = PromotionKind::BulkThreshold {
            min_subtotal_cents: 5000,
            rate_bps: 1000,
        };

        let mut small = Cart::new();
        small.add_item(&test_product("1", 4000, 0), 1).unwrap();
        let totals = compute_totals(&small, &[promo("bulk", kind.clone(), 0)]);
        assert_eq!(totals.discount_cents, 0);

        let mut big = Cart::new();
        big.add_item(&test_product("1", 6000, 0), 1).unwrap();
        let totals = compute_totals(&big, &[promo("bulk", kind, 0)]);
        assert_eq!(totals.discount_cents, 600);
    }

    #[test]
    fn test_total_never_negative() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 100, 0), 1).unwrap();

        let promos = vec![promo(
            "huge",
            PromotionKind::FixedAmount {
                amount_cents: 1_000_000,
            },
            0,
        )];

        // Fixed-amount benefit is capped at the net subtotal, and the total
        // floor guards against any stacking with line discounts.
        let totals = compute_totals(&cart, &promos);
        assert!(totals.total_cents >= 0);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_line_discount_reduces_tax_base_and_aggregates() {
        let mut product = test_product("1", 1000, 1000);
        product.discount_bps = 2000; // 20% off
        let mut cart = Cart::new();
        cart.add_item(&product, 1).unwrap();

        let totals = compute_totals(&cart, &[]);
        assert_eq!(totals.subtotal_cents, 1000);
        assert_eq!(totals.discount_cents, 200);
        assert_eq!(totals.tax_cents, 80); // 10% of the $8.00 net
        assert_eq!(totals.total_cents, 1000 + 80 - 200);
    }
}
