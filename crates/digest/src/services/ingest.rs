//! Deduplicating ingestion for deals and users.
//!
//! Every write follows the same upsert flow: look up by the entity's unique
//! key, insert only if absent. Nothing is ever updated - resubmitting a deal
//! with the same (retailer, product, start date) triple is counted as a skip
//! even when its price or end date differ from the stored record.
//!
//! Records are processed one at a time in input order. A storage error
//! aborts the remaining sequence; whatever was already written stays
//! written.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use dealbird_core::{IngestReport, RawDeal, RawUser, SeedReport};

use crate::store::{DealStore, StoreError};

/// Errors that can occur when ingesting from a feed file.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The feed file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The feed file is not a valid JSON array of records.
    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A storage operation failed; the remaining records were not processed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Ingest raw deal records in order, upserting retailer, product, and deal
/// for each.
///
/// # Errors
///
/// Returns `StoreError` on the first storage failure; earlier writes are
/// not rolled back.
pub async fn ingest_deals(
    store: &dyn DealStore,
    raw_deals: &[RawDeal],
) -> Result<IngestReport, StoreError> {
    let mut report = IngestReport::default();

    info!(count = raw_deals.len(), "Ingesting deals");

    for raw in raw_deals {
        let retailer = match store.retailer_by_name(&raw.retailer).await? {
            Some(existing) => {
                report.retailers.existing += 1;
                existing
            }
            None => {
                let created = store.insert_retailer(&raw.retailer).await?;
                report.retailers.inserted += 1;
                info!(retailer = %created.name, "New retailer");
                created
            }
        };

        let product = match store.product_by_name_and_size(&raw.product, &raw.size).await? {
            Some(existing) => {
                report.products.existing += 1;
                existing
            }
            None => {
                let created = store
                    .insert_product(&raw.product, &raw.size, &raw.category)
                    .await?;
                report.products.inserted += 1;
                info!(product = %created.name, size = %created.size, "New product");
                created
            }
        };

        if store
            .deal_by_key(retailer.id, product.id, raw.start)
            .await?
            .is_some()
        {
            report.deals.skipped += 1;
            debug!(
                product = %raw.product,
                retailer = %raw.retailer,
                start = %raw.start,
                "Duplicate deal skipped"
            );
        } else {
            store
                .insert_deal(retailer.id, product.id, raw.price, raw.start, raw.end)
                .await?;
            report.deals.inserted += 1;
            info!(
                product = %raw.product,
                retailer = %raw.retailer,
                price = %raw.price,
                "New deal"
            );
        }
    }

    Ok(report)
}

/// Read a JSON array of raw deals from `path` and ingest it.
///
/// # Errors
///
/// Returns `IngestError` if the file cannot be read or parsed, or a storage
/// operation fails.
pub async fn ingest_deals_from_file(
    store: &dyn DealStore,
    path: &Path,
) -> Result<IngestReport, IngestError> {
    let raw_deals: Vec<RawDeal> = read_records(path).await?;
    Ok(ingest_deals(store, &raw_deals).await?)
}

/// Seed raw user records: insert each user unless their email already
/// exists. Never updates an existing user's name or preferences.
///
/// # Errors
///
/// Returns `StoreError` on the first storage failure.
pub async fn seed_users(
    store: &dyn DealStore,
    raw_users: &[RawUser],
) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    info!(count = raw_users.len(), "Seeding users");

    for raw in raw_users {
        if store.user_by_email(&raw.email).await?.is_some() {
            report.existing += 1;
            debug!(email = %raw.email, "User already exists");
        } else {
            store
                .insert_user(&raw.name, &raw.email, &raw.preferred_retailers)
                .await?;
            report.inserted += 1;
            info!(user = %raw.name, email = %raw.email, "New user");
        }
    }

    Ok(report)
}

/// Read a JSON array of raw users from `path` and seed it.
///
/// # Errors
///
/// Returns `IngestError` if the file cannot be read or parsed, or a storage
/// operation fails.
pub async fn seed_users_from_file(
    store: &dyn DealStore,
    path: &Path,
) -> Result<SeedReport, IngestError> {
    let raw_users: Vec<RawUser> = read_records(path).await?;
    Ok(seed_users(store, &raw_users).await?)
}

async fn read_records<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Vec<T>, IngestError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&content).map_err(|source| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
