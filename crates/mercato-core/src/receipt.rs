//! # Receipt Projection
//!
//! Renders a completed transaction as printable text lines.
//!
//! ## Layout
//! ```text
//! ┌──────────────────────────────────┐
//! │          CORNER GROCERY          │   header (centered store name)
//! │ Receipt #TXN-20260806-1a2b3c     │
//! │ 2026-08-06 14:03:22              │
//! │ -------------------------------- │
//! │ Coca-Cola 330ml                  │   two lines per item
//! │   2 x $3.99 = $7.98              │
//! │ -------------------------------- │
//! │ Subtotal: $7.98                  │
//! │ Tax: $0.80                       │
//! │ TOTAL: $8.78                     │
//! │ Payment: cash                    │
//! │ Tendered: $10.00                 │   cash only
//! │ Change: $1.22                    │
//! │                                  │
//! │ Thank you for your business!     │
//! └──────────────────────────────────┘
//! ```
//!
//! This is purely a projection: it borrows the transaction and never
//! mutates it. ESC/POS control sequences are the printer driver's concern,
//! not this module's.

use crate::money::Money;
use crate::types::{PaymentMethod, Transaction, TransactionLine};

/// Width of the separator rule on a standard 58mm thermal roll.
const RULE_WIDTH: usize = 32;

// =============================================================================
// Receipt
// =============================================================================

/// A printable view over an immutable transaction.
#[derive(Debug, Clone)]
pub struct Receipt<'a> {
    store_name: &'a str,
    transaction: &'a Transaction,
    lines: &'a [TransactionLine],
    /// Cash tender and change, for display only. Never persisted.
    cash: Option<(Money, Money)>,
}

impl<'a> Receipt<'a> {
    /// Creates a receipt view for a transaction.
    pub fn new(
        store_name: &'a str,
        transaction: &'a Transaction,
        lines: &'a [TransactionLine],
    ) -> Self {
        Receipt {
            store_name,
            transaction,
            lines,
            cash: None,
        }
    }

    /// Adds the ephemeral cash tender/change footer.
    pub fn with_cash(mut self, tendered: Money, change: Money) -> Self {
        self.cash = Some((tendered, change));
        self
    }

    /// Produces the display lines lazily, in print order.
    ///
    /// ## Example
    /// ```rust,ignore
    /// for line in receipt.render() {
    ///     printer.write_line(&line)?;
    /// }
    /// ```
    pub fn render(&self) -> impl Iterator<Item = String> + '_ {
        let header = [
            center(self.store_name),
            format!("Receipt #{}", self.transaction.receipt_number),
            self.transaction
                .completed_at
                .unwrap_or(self.transaction.created_at)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            rule(),
        ];

        let items = self.lines.iter().flat_map(|line| {
            [
                line.name_snapshot.clone(),
                format!(
                    "  {} x {} = {}",
                    line.quantity,
                    line.unit_price(),
                    line.line_total()
                ),
            ]
        });

        let txn = self.transaction;
        let mut totals = vec![
            rule(),
            format!("Subtotal: {}", txn.subtotal()),
        ];
        if txn.discount_cents != 0 {
            totals.push(format!("Discount: -{}", txn.discount().abs()));
        }
        totals.push(format!("Tax: {}", txn.tax()));
        totals.push(format!("TOTAL: {}", txn.total()));
        totals.push(format!("Payment: {}", method_label(txn.payment_method)));
        if let Some((tendered, change)) = self.cash {
            totals.push(format!("Tendered: {}", tendered));
            totals.push(format!("Change: {}", change));
        }
        if txn.is_return {
            if let Some(original) = &txn.original_transaction_id {
                totals.push(format!("Return of {}", original));
            }
        }
        totals.push(String::new());
        totals.push("Thank you for your business!".to_string());

        header.into_iter().chain(items).chain(totals)
    }
}

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

fn center(text: &str) -> String {
    if text.len() >= RULE_WIDTH {
        return text.to_string();
    }
    let pad = (RULE_WIDTH - text.len()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn method_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "cash",
        PaymentMethod::Card => "card",
        PaymentMethod::Mobile => "mobile",
        PaymentMethod::LoyaltyPoints => "loyalty points",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentStatus;
    use chrono::Utc;

    fn test_transaction() -> (Transaction, Vec<TransactionLine>) {
        let now = Utc::now();
        let txn = Transaction {
            id: "t-1".to_string(),
            receipt_number: "TXN-20260806-0001".to_string(),
            customer_id: None,
            status: PaymentStatus::Completed,
            subtotal_cents: 798,
            tax_cents: 80,
            discount_cents: 0,
            total_cents: 878,
            payment_method: PaymentMethod::Cash,
            applied_promotion_id: None,
            is_return: false,
            original_transaction_id: None,
            created_at: now,
            completed_at: Some(now),
        };
        let lines = vec![TransactionLine {
            id: "l-1".to_string(),
            transaction_id: "t-1".to_string(),
            product_id: "p-1".to_string(),
            name_snapshot: "Coca-Cola 330ml".to_string(),
            unit_price_cents: 399,
            quantity: 2,
            discount_cents: 0,
            tax_cents: 80,
            line_total_cents: 798,
            created_at: now,
        }];
        (txn, lines)
    }

    #[test]
    fn test_render_reproduces_every_line_item() {
        let (txn, lines) = test_transaction();
        let receipt = Receipt::new("Corner Grocery", &txn, &lines);
        let text: Vec<String> = receipt.render().collect();

        assert!(text.iter().any(|l| l.contains("Corner Grocery")));
        assert!(text.iter().any(|l| l.contains("TXN-20260806-0001")));
        assert!(text.iter().any(|l| l == "Coca-Cola 330ml"));
        assert!(text.iter().any(|l| l.contains("2 x $3.99 = $7.98")));
        assert!(text.iter().any(|l| l.contains("Subtotal: $7.98")));
        assert!(text.iter().any(|l| l.contains("Tax: $0.80")));
        assert!(text.iter().any(|l| l.contains("TOTAL: $8.78")));
        assert!(text.iter().any(|l| l.contains("Payment: cash")));
    }

    #[test]
    fn test_cash_footer_shows_change() {
        let (txn, lines) = test_transaction();
        let receipt = Receipt::new("Corner Grocery", &txn, &lines)
            .with_cash(Money::from_cents(1000), Money::from_cents(122));
        let text: Vec<String> = receipt.render().collect();

        assert!(text.iter().any(|l| l.contains("Tendered: $10.00")));
        assert!(text.iter().any(|l| l.contains("Change: $1.22")));
    }

    #[test]
    fn test_discount_line_hidden_when_zero() {
        let (txn, lines) = test_transaction();
        let receipt = Receipt::new("Corner Grocery", &txn, &lines);
        assert!(!receipt.render().any(|l| l.starts_with("Discount:")));
    }

    #[test]
    fn test_render_does_not_mutate_transaction() {
        let (txn, lines) = test_transaction();
        let before = serde_json::to_string(&txn).unwrap();

        let receipt = Receipt::new("Corner Grocery", &txn, &lines);
        let _ = receipt.render().count();
        let _ = receipt.render().count();

        assert_eq!(serde_json::to_string(&txn).unwrap(), before);
    }
}
