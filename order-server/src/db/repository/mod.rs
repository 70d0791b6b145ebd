//! Repository Module
//!
//! CRUD operations over the embedded SurrealDB tables.
//!
//! Soft-delete filtering is explicit: repositories expose `find_active`
//! variants that exclude `is_deleted` rows, and call sites choose which
//! view they want. There is no implicit query hook.

// Catalog
pub mod addon;
pub mod location;
pub mod meal;

// Checkout
pub mod cart;
pub mod coupon;
pub mod order;

// Loyalty
pub mod wallet;

// Notifications
pub mod outbox;

// Re-exports
pub use addon::AddonRepository;
pub use cart::CartRepository;
pub use coupon::CouponRepository;
pub use location::LocationRepository;
pub use meal::MealRepository;
pub use order::OrderRepository;
pub use outbox::OutboxRepository;
pub use wallet::WalletRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl RepoError {
    /// Whether a raw database error reports a unique-index violation.
    pub fn is_unique_violation(err: &surrealdb::Error) -> bool {
        let msg = err.to_string().to_lowercase();
        msg.contains("unique") || msg.contains("already exists") || msg.contains("duplicate")
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID Convention: rows are keyed by a prefixed business id
// =============================================================================
//
// Every table row carries a `*_id` string generated by
// `shared::util::next_id` ("ord_...", "cpn_...", ...). Queries filter on
// that field; storage-engine record ids are never exposed outside this
// module.

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
