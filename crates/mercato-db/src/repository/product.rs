//! # Product Repository
//!
//! Catalog lookup: the read-only product queries the cart and checkout
//! engine consume.
//!
//! ## Lookup Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Catalog Lookup                                     │
//! │                                                                         │
//! │  Scan "5449000000996" ──► find_by_barcode ──► Product | NotFound        │
//! │                           (exact match; a miss IS an error)             │
//! │                                                                         │
//! │  Type "coke" ───────────► search ───────────► [Product, ...]            │
//! │                           (substring on name, case-insensitive;         │
//! │                            an empty result set is NOT an error)         │
//! │                                                                         │
//! │  Internal reference ────► get_by_id ────────► Option<Product>           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is never mutated here - that is the stock repository's job, so the
//! cached level and the movement ledger can only change together.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use mercato_core::validation::{
    validate_barcode, validate_price_cents, validate_product_name, validate_rate_bps,
    validate_search_query,
};
use mercato_core::Product;

const PRODUCT_COLUMNS: &str = "\
    id, barcode, name, description, category, \
    price_cents, cost_cents, discount_bps, tax_rate_bps, \
    current_stock, reorder_level, is_active, created_at, updated_at";

/// Repository for product catalog queries.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Resolves a barcode to a product.
    ///
    /// Exact match on active products. A miss is `DbError::NotFound` -
    /// unlike an empty search, a scanned barcode that resolves to nothing
    /// is an error the cashier must see.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Product> {
        debug!(barcode = %barcode, "Barcode lookup");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 AND is_active = 1"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        product.ok_or_else(|| DbError::not_found("Product", barcode))
    }

    /// Searches products by name substring, case-insensitively.
    ///
    /// ## Arguments
    /// * `query` - Search term (can be partial; empty lists active products)
    /// * `category` - Optional exact category filter
    /// * `limit` - Maximum results to return
    ///
    /// Each call re-queries; results are a finite snapshot, not a cursor.
    pub async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        limit: u32,
    ) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, category = ?category, limit = %limit, "Searching products");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE name LIKE '%' || ?1 || '%' \
             AND (?2 IS NULL OR category = ?2) \
             AND is_active = 1 \
             ORDER BY name \
             LIMIT ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&query)
            .bind(category)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `Validation` - barcode/name/price/rate out of shape
    /// * `UniqueViolation` - barcode already exists
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;
        validate_rate_bps(product.tax_rate_bps)?;
        validate_rate_bps(product.discount_bps)?;
        if let Some(barcode) = &product.barcode {
            validate_barcode(barcode)?;
        }

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (
                id, barcode, name, description, category,
                price_cents, cost_cents, discount_bps, tax_rate_bps,
                current_stock, reorder_level, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&product.id)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.discount_bps)
        .bind(product.tax_rate_bps)
        .bind(product.current_stock)
        .bind(product.reorder_level)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical transactions still reference the row, so rows are never
    /// physically deleted.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists active products whose cached stock is at or below their
    /// reorder level. Informational; restocking itself is out of scope.
    pub async fn list_below_reorder(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND current_stock <= reorder_level \
             ORDER BY name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(name: &str, barcode: Option<&str>, category: Option<&str>) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            barcode: barcode.map(String::from),
            name: name.to_string(),
            description: None,
            category: category.map(String::from),
            price_cents: 399,
            cost_cents: Some(250),
            discount_bps: 0,
            tax_rate_bps: 1000,
            current_stock: 10,
            reorder_level: 2,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_barcode_hit_and_miss() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("Coca-Cola 330ml", Some("5449000000996"), None))
            .await
            .unwrap();

        let found = repo.find_by_barcode("5449000000996").await.unwrap();
        assert_eq!(found.name, "Coca-Cola 330ml");

        // A miss is an error, not an empty result.
        let miss = repo.find_by_barcode("0000000000000").await;
        assert!(matches!(miss, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_search_is_substring_and_case_insensitive() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("Coca-Cola 330ml", None, Some("drinks")))
            .await
            .unwrap();
        repo.insert(&product("Pepsi 330ml", None, Some("drinks")))
            .await
            .unwrap();
        repo.insert(&product("Cold Brew Coffee", None, Some("coffee")))
            .await
            .unwrap();

        let hits = repo.search("COLA", None, 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Coca-Cola 330ml");

        // Empty result set is not an error.
        let none = repo.search("durian", None, 20).await.unwrap();
        assert!(none.is_empty());

        // Category filter narrows results.
        let drinks = repo.search("33", Some("drinks"), 20).await.unwrap();
        assert_eq!(drinks.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = test_db().await;
        let repo = db.products();
        repo.insert(&product("First", Some("4000000000001"), None))
            .await
            .unwrap();

        let dup = repo
            .insert(&product("Second", Some("4000000000001"), None))
            .await;
        assert!(matches!(dup, Err(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_invalid_barcode_rejected_before_sql() {
        let db = test_db().await;
        let repo = db.products();

        let bad = repo.insert(&product("Bad", Some("not-digits"), None)).await;
        assert!(matches!(bad, Err(DbError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_below_reorder() {
        let db = test_db().await;
        let repo = db.products();

        let mut low = product("Low stock", None, None);
        low.current_stock = 1;
        low.reorder_level = 5;
        repo.insert(&low).await.unwrap();

        let mut fine = product("Fine stock", None, None);
        fine.current_stock = 50;
        fine.reorder_level = 5;
        repo.insert(&fine).await.unwrap();

        let below = repo.list_below_reorder().await.unwrap();
        assert_eq!(below.len(), 1);
        assert_eq!(below[0].name, "Low stock");
    }
}
