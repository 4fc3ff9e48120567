//! The storage port and its backends.
//!
//! [`DealStore`] is the uniform contract the ingestion and digest services
//! are written against: lookup-by-unique-key, insert, list, and the joined
//! active-deal query. Two backends implement it - [`SqliteStore`] (embedded
//! file database) and [`PgStore`] (hosted Postgres) - and must yield
//! identical logical results for identical data.
//!
//! Uniqueness (retailer name, product name+size, deal composite key, user
//! email) is declared as UNIQUE constraints in both schemas; the services
//! still use lookup-before-insert as the portable upsert flow, so a
//! [`StoreError::Conflict`] only surfaces if a caller skips the lookup.
//!
//! One store handle is opened per run and closed at the end; there is no
//! concurrent access.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use dealbird_core::{Deal, Email, EnrichedDeal, Product, ProductId, Retailer, RetailerId, User};

use crate::config::StorageConfig;

mod postgres;
mod sqlite;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Errors that can occur in a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Could not open the embedded database file.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An insert hit a UNIQUE constraint.
    #[error("duplicate {0}")]
    Conflict(String),

    /// A stored row failed to decode into its entity.
    #[error("corrupt row in storage: {0}")]
    Corrupt(String),
}

/// Map a UNIQUE violation onto [`StoreError::Conflict`], leaving every other
/// database error as-is.
pub(crate) fn unique_conflict(e: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(what.to_owned());
    }
    StoreError::Database(e)
}

/// Uniform persistence contract for retailers, products, deals and users.
#[async_trait]
pub trait DealStore: Send + Sync {
    /// Look up a retailer by its unique name.
    async fn retailer_by_name(&self, name: &str) -> Result<Option<Retailer>, StoreError>;

    /// Insert a new retailer.
    async fn insert_retailer(&self, name: &str) -> Result<Retailer, StoreError>;

    /// Look up a product by its unique (name, size) pair.
    async fn product_by_name_and_size(
        &self,
        name: &str,
        size: &str,
    ) -> Result<Option<Product>, StoreError>;

    /// Insert a new product.
    async fn insert_product(
        &self,
        name: &str,
        size: &str,
        category: &str,
    ) -> Result<Product, StoreError>;

    /// Look up a deal by its composite dedup key.
    async fn deal_by_key(
        &self,
        retailer_id: RetailerId,
        product_id: ProductId,
        start_date: NaiveDate,
    ) -> Result<Option<Deal>, StoreError>;

    /// Insert a new deal.
    async fn insert_deal(
        &self,
        retailer_id: RetailerId,
        product_id: ProductId,
        price: Decimal,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Deal, StoreError>;

    /// All deals active on `today` (endpoints inclusive) at the named
    /// retailers, joined with retailer and product, ordered price ascending
    /// with insertion order as the tiebreak.
    ///
    /// An empty `retailer_names` yields an empty result, never "all deals".
    async fn active_deals_for_retailers(
        &self,
        retailer_names: &[String],
        today: NaiveDate,
    ) -> Result<Vec<EnrichedDeal>, StoreError>;

    /// Look up a user by their unique email.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// Insert a new user.
    async fn insert_user(
        &self,
        name: &str,
        email: &Email,
        preferred_retailers: &[String],
    ) -> Result<User, StoreError>;

    /// All users in storage natural (insertion) order.
    async fn all_users(&self) -> Result<Vec<User>, StoreError>;

    /// Release the store's connection. Call once at the end of the run.
    async fn close(&self);
}

/// Open the backend selected by configuration.
///
/// # Errors
///
/// Returns `StoreError` if the backend cannot be opened or its schema cannot
/// be created.
pub async fn connect(config: &StorageConfig) -> Result<Box<dyn DealStore>, StoreError> {
    match config {
        StorageConfig::Sqlite { path } => Ok(Box::new(SqliteStore::connect(path).await?)),
        StorageConfig::Postgres { database_url } => {
            Ok(Box::new(PgStore::connect(database_url).await?))
        }
    }
}
