//! # Promotion Repository
//!
//! Stores promotions flat (one row, nullable parameter columns) and maps
//! them to the closed `PromotionKind` enum the pricing engine consumes.
//! A row whose `promotion_type` is unknown or whose parameters are missing
//! is a data error, not something to guess around.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use mercato_core::{Promotion, PromotionKind};

/// Flat row shape; `TryFrom` turns it into the typed `Promotion`.
#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: String,
    name: String,
    promotion_type: String,
    rate_bps: Option<u32>,
    amount_cents: Option<i64>,
    product_id: Option<String>,
    min_subtotal_cents: Option<i64>,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = DbError;

    fn try_from(row: PromotionRow) -> Result<Self, Self::Error> {
        let kind = match row.promotion_type.as_str() {
            "percentage" => PromotionKind::Percentage {
                rate_bps: row.rate_bps.ok_or_else(|| bad_row(&row.id, "rate_bps"))?,
            },
            "fixed_amount" => PromotionKind::FixedAmount {
                amount_cents: row
                    .amount_cents
                    .ok_or_else(|| bad_row(&row.id, "amount_cents"))?,
            },
            "bogo" => PromotionKind::Bogo {
                product_id: row
                    .product_id
                    .clone()
                    .ok_or_else(|| bad_row(&row.id, "product_id"))?,
            },
            "bulk_threshold" => PromotionKind::BulkThreshold {
                min_subtotal_cents: row
                    .min_subtotal_cents
                    .ok_or_else(|| bad_row(&row.id, "min_subtotal_cents"))?,
                rate_bps: row.rate_bps.ok_or_else(|| bad_row(&row.id, "rate_bps"))?,
            },
            other => {
                return Err(DbError::Internal(format!(
                    "Promotion {} has unknown type '{}'",
                    row.id, other
                )))
            }
        };

        Ok(Promotion {
            id: row.id,
            name: row.name,
            kind,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

fn bad_row(id: &str, column: &str) -> DbError {
    DbError::Internal(format!("Promotion {} is missing {}", id, column))
}

/// Repository for promotions.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Lists promotions active at the given instant, oldest first.
    ///
    /// Creation order matters: the pricing engine breaks benefit ties by
    /// earliest creation, so rows come back already sorted that way.
    pub async fn list_active(&self, at: DateTime<Utc>) -> DbResult<Vec<Promotion>> {
        let rows = sqlx::query_as::<_, PromotionRow>(
            "SELECT id, name, promotion_type, rate_bps, amount_cents,
                    product_id, min_subtotal_cents, starts_at, ends_at,
                    is_active, created_at
             FROM promotions
             WHERE is_active = 1
             AND starts_at <= ?1
             AND (ends_at IS NULL OR ends_at >= ?1)
             ORDER BY created_at, id",
        )
        .bind(at)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded active promotions");

        rows.into_iter().map(Promotion::try_from).collect()
    }

    /// Inserts a promotion.
    pub async fn insert(&self, promotion: &Promotion) -> DbResult<()> {
        debug!(id = %promotion.id, name = %promotion.name, "Inserting promotion");

        let (promotion_type, rate_bps, amount_cents, product_id, min_subtotal_cents) =
            match &promotion.kind {
                PromotionKind::Percentage { rate_bps } => {
                    ("percentage", Some(*rate_bps), None, None, None)
                }
                PromotionKind::FixedAmount { amount_cents } => {
                    ("fixed_amount", None, Some(*amount_cents), None, None)
                }
                PromotionKind::Bogo { product_id } => {
                    ("bogo", None, None, Some(product_id.clone()), None)
                }
                PromotionKind::BulkThreshold {
                    min_subtotal_cents,
                    rate_bps,
                } => (
                    "bulk_threshold",
                    Some(*rate_bps),
                    None,
                    None,
                    Some(*min_subtotal_cents),
                ),
            };

        sqlx::query(
            "INSERT INTO promotions (
                id, name, promotion_type, rate_bps, amount_cents,
                product_id, min_subtotal_cents, starts_at, ends_at,
                is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(promotion_type)
        .bind(rate_bps)
        .bind(amount_cents)
        .bind(product_id)
        .bind(min_subtotal_cents)
        .bind(promotion.starts_at)
        .bind(promotion.ends_at)
        .bind(promotion.is_active)
        .bind(promotion.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
