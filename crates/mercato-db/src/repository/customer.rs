//! # Customer Repository
//!
//! Loyalty balances. The deduction path is a guarded compare-and-set for
//! the same reason stock decrements are: redemptions from two terminals
//! must not overdraw a balance.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use mercato_core::Customer;

/// Repository for customer records and loyalty balances.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, loyalty_points, is_active, created_at
             FROM customers
             WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.name, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (id, name, email, loyalty_points, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.loyalty_points)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the current loyalty balance.
    ///
    /// ## Errors
    /// `NotFound` when the customer does not exist.
    pub async fn get_loyalty_balance(&self, id: &str) -> DbResult<i64> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT loyalty_points FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        balance.ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Attempts to deduct points via a guarded compare-and-set.
    ///
    /// Returns `true` when the deduction happened, `false` when the balance
    /// was insufficient at the moment of the update. The caller decides what
    /// an insufficient balance means (for checkout: `InsufficientPoints`).
    pub async fn try_deduct_points(&self, id: &str, points: i64) -> DbResult<bool> {
        debug!(id = %id, points = %points, "Deducting loyalty points");

        let result = sqlx::query(
            "UPDATE customers
             SET loyalty_points = loyalty_points - ?2
             WHERE id = ?1 AND loyalty_points >= ?2",
        )
        .bind(id)
        .bind(points)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "not enough points" from "no such customer".
        self.get_loyalty_balance(id).await?;
        Ok(false)
    }

    /// Credits points back (compensation for a failed sale, or earning).
    pub async fn credit_points(&self, id: &str, points: i64) -> DbResult<()> {
        debug!(id = %id, points = %points, "Crediting loyalty points");

        let result = sqlx::query(
            "UPDATE customers SET loyalty_points = loyalty_points + ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(points)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
