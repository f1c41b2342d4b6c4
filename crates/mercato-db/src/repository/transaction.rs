//! # Transaction Repository
//!
//! Persistence for transactions and their frozen line snapshots.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Transaction Lifecycle                                │
//! │                                                                         │
//! │  1. INSERT (status = pending)                                           │
//! │     └── insert() → transaction + line snapshots, one SQL transaction    │
//! │                                                                         │
//! │  2a. SETTLE                                                             │
//! │      └── mark_completed() → guarded: only a pending row can complete    │
//! │                                                                         │
//! │  2b. FAIL                                                               │
//! │      └── mark_failed() → guarded the same way; terminal                 │
//! │                                                                         │
//! │  Completed and failed rows are never updated again - immutability is    │
//! │  enforced by the status predicate, not by convention.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercato_core::{Transaction, TransactionLine};

const TRANSACTION_COLUMNS: &str = "\
    id, receipt_number, customer_id, status, \
    subtotal_cents, tax_cents, discount_cents, total_cents, \
    payment_method, applied_promotion_id, is_return, \
    original_transaction_id, created_at, completed_at";

/// Repository for transaction records.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Inserts a transaction and its line snapshots atomically.
    pub async fn insert(&self, txn: &Transaction, lines: &[TransactionLine]) -> DbResult<()> {
        debug!(id = %txn.id, receipt_number = %txn.receipt_number, "Inserting transaction");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO transactions (
                id, receipt_number, customer_id, status,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                payment_method, applied_promotion_id, is_return,
                original_transaction_id, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&txn.id)
        .bind(&txn.receipt_number)
        .bind(&txn.customer_id)
        .bind(txn.status)
        .bind(txn.subtotal_cents)
        .bind(txn.tax_cents)
        .bind(txn.discount_cents)
        .bind(txn.total_cents)
        .bind(txn.payment_method)
        .bind(&txn.applied_promotion_id)
        .bind(txn.is_return)
        .bind(&txn.original_transaction_id)
        .bind(txn.created_at)
        .bind(txn.completed_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            sqlx::query(
                "INSERT INTO transaction_lines (
                    id, transaction_id, product_id, name_snapshot,
                    unit_price_cents, quantity, discount_cents, tax_cents,
                    line_total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )
            .bind(&line.id)
            .bind(&line.transaction_id)
            .bind(&line.product_id)
            .bind(&line.name_snapshot)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line.discount_cents)
            .bind(line.tax_cents)
            .bind(line.line_total_cents)
            .bind(line.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(())
    }

    /// Marks a pending transaction as completed.
    ///
    /// The `status = 'pending'` predicate is what makes completed
    /// transactions immutable: a second call, or a call against a failed
    /// row, affects zero rows and errors.
    pub async fn mark_completed(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE transactions
             SET status = 'completed', completed_at = ?2
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (pending)", id));
        }

        debug!(id = %id, "Transaction completed");
        Ok(())
    }

    /// Marks a pending transaction as failed. Terminal; a retry is a new
    /// transaction.
    pub async fn mark_failed(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE transactions
             SET status = 'failed'
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (pending)", id));
        }

        debug!(id = %id, "Transaction failed");
        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
        let txn = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(txn)
    }

    /// Gets all lines for a transaction, in insertion order.
    pub async fn get_lines(&self, transaction_id: &str) -> DbResult<Vec<TransactionLine>> {
        let lines = sqlx::query_as::<_, TransactionLine>(
            "SELECT id, transaction_id, product_id, name_snapshot,
                    unit_price_cents, quantity, discount_cents, tax_cents,
                    line_total_cents, created_at
             FROM transaction_lines
             WHERE transaction_id = ?1
             ORDER BY rowid",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists transactions in a time window, newest first.
    ///
    /// The read-only projection for the reporting collaborator.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE created_at >= ?1 AND created_at <= ?2 \
             ORDER BY created_at DESC"
        );
        let txns = sqlx::query_as::<_, Transaction>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(txns)
    }
}

/// Generates a new transaction line ID.
pub fn generate_line_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
