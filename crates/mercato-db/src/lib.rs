//! # mercato-db: Database Layer for Mercato POS
//!
//! This crate provides database access for the Mercato POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Mercato POS Data Flow                             │
//! │                                                                         │
//! │  mercato-engine (complete_sale, process_return)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    mercato-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  product       │    │  (embedded)  │  │   │
//! │  │   │               │    │  transaction   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  stock         │    │ 001_init.sql │  │   │
//! │  │   │ WAL, FKs on   │    │  customer      │    │              │  │   │
//! │  │   └───────────────┘    │  promotion     │    └──────────────┘  │   │
//! │  │                        └────────────────┘                      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                        SQLite Database                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercato_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/mercato.db")).await?;
//! let product = db.products().find_by_barcode("5449000000996").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::promotion::PromotionRepository;
pub use repository::stock::{StockError, StockRepository, StockResult};
pub use repository::transaction::TransactionRepository;
