//! # Stock Repository
//!
//! The inventory mutation service: the only code allowed to change
//! `products.current_stock`, and the writer of the append-only
//! stock-movement ledger.
//!
//! ## Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      apply_sale(lines)                                  │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    for each line:                                                       │
//! │      UPDATE products                                                    │
//! │         SET current_stock = current_stock - qty                         │
//! │       WHERE id = ? AND current_stock >= qty    ← guarded decrement      │
//! │                                                                         │
//! │      rows_affected == 0 ──► ROLLBACK, StockError::Exhausted             │
//! │                                                                         │
//! │      INSERT INTO stock_movements (delta = -qty, type = 'sale')          │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Either every line's stock moves and every movement is recorded,        │
//! │  or nothing changes at all.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why a guarded UPDATE and not a mutex?
//! Terminals run as independent processes against the same database. The
//! `current_stock >= qty` predicate is a compare-and-set evaluated inside
//! the database's own write serialization, so two terminals selling the
//! last unit cannot both succeed - one loses the race and sees `Exhausted`.

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercato_core::{MovementType, StockMovement, TransactionLine};

// =============================================================================
// Stock Error
// =============================================================================

/// Errors from atomic stock mutation.
#[derive(Debug, Error)]
pub enum StockError {
    /// A guarded decrement found less stock than requested. The whole batch
    /// was rolled back; nothing moved.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    Exhausted {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Underlying database failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for StockError {
    fn from(err: sqlx::Error) -> Self {
        StockError::Db(DbError::from(err))
    }
}

/// Result type for stock operations.
pub type StockResult<T> = Result<T, StockError>;

// =============================================================================
// Stock Repository
// =============================================================================

/// Repository for stock mutation and the movement ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Applies a sale: decrements stock for every line and appends
    /// sale-typed movements, all in one database transaction.
    ///
    /// ## Errors
    /// `StockError::Exhausted` names the first product whose stock could not
    /// cover its line; in that case no stock was decremented at all. The
    /// checkout engine must treat this as a payment failure.
    pub async fn apply_sale(
        &self,
        lines: &[TransactionLine],
        transaction_id: &str,
    ) -> StockResult<Vec<StockMovement>> {
        debug!(transaction_id = %transaction_id, lines = lines.len(), "Applying sale to stock");

        let mut tx = self.pool.begin().await?;
        let mut movements = Vec::with_capacity(lines.len());
        let now = Utc::now();

        for line in lines {
            let result = sqlx::query(
                "UPDATE products
                 SET current_stock = current_stock - ?2, updated_at = ?3
                 WHERE id = ?1 AND current_stock >= ?2",
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Guard failed: either unknown product or not enough stock.
                // Dropping `tx` rolls the whole batch back.
                let available: i64 =
                    sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                        .bind(&line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?
                        .unwrap_or(0);

                warn!(
                    product_id = %line.product_id,
                    available = %available,
                    requested = %line.quantity,
                    "Stock exhausted, rolling back sale batch"
                );

                return Err(StockError::Exhausted {
                    product_id: line.product_id.clone(),
                    available,
                    requested: line.quantity,
                });
            }

            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: line.product_id.clone(),
                quantity_delta: -line.quantity,
                movement_type: MovementType::Sale,
                transaction_id: Some(transaction_id.to_string()),
                created_at: now,
            };
            insert_movement(&mut tx, &movement).await?;
            movements.push(movement);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(movements)
    }

    /// Applies a return: increments stock for every returned line and
    /// appends return-typed movements linked to the original transaction.
    pub async fn apply_return(
        &self,
        lines: &[(String, i64)],
        original_transaction_id: &str,
    ) -> StockResult<Vec<StockMovement>> {
        debug!(
            original_transaction_id = %original_transaction_id,
            lines = lines.len(),
            "Applying return to stock"
        );

        let mut tx = self.pool.begin().await?;
        let mut movements = Vec::with_capacity(lines.len());
        let now = Utc::now();

        for (product_id, quantity) in lines {
            let result = sqlx::query(
                "UPDATE products
                 SET current_stock = current_stock + ?2, updated_at = ?3
                 WHERE id = ?1",
            )
            .bind(product_id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(StockError::Db(DbError::not_found("Product", product_id)));
            }

            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                product_id: product_id.clone(),
                quantity_delta: *quantity,
                movement_type: MovementType::Return,
                transaction_id: Some(original_transaction_id.to_string()),
                created_at: now,
            };
            insert_movement(&mut tx, &movement).await?;
            movements.push(movement);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(movements)
    }

    /// Records a manual stock adjustment, waste write-off or purchase
    /// receipt as a signed delta with its ledger entry.
    ///
    /// Negative deltas are guarded the same way as sales.
    pub async fn record_adjustment(
        &self,
        product_id: &str,
        delta: i64,
        movement_type: MovementType,
    ) -> StockResult<StockMovement> {
        debug!(product_id = %product_id, delta = %delta, movement_type = ?movement_type, "Recording adjustment");

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products
             SET current_stock = current_stock + ?2, updated_at = ?3
             WHERE id = ?1 AND current_stock + ?2 >= 0",
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let available: i64 =
                sqlx::query_scalar("SELECT current_stock FROM products WHERE id = ?1")
                    .bind(product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .unwrap_or(0);

            return Err(StockError::Exhausted {
                product_id: product_id.to_string(),
                available,
                requested: -delta,
            });
        }

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            quantity_delta: delta,
            movement_type,
            transaction_id: None,
            created_at: now,
        };
        insert_movement(&mut tx, &movement).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(movement)
    }

    /// Reads the ledger for one product, oldest first.
    pub async fn movements_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT id, product_id, quantity_delta, movement_type, transaction_id, created_at
             FROM stock_movements
             WHERE product_id = ?1
             ORDER BY created_at, id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

async fn insert_movement(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    movement: &StockMovement,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO stock_movements (
            id, product_id, quantity_delta, movement_type, transaction_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.quantity_delta)
    .bind(movement.movement_type)
    .bind(&movement.transaction_id)
    .bind(movement.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
