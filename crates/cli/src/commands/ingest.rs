//! Deal ingestion command.

use std::path::Path;

use tracing::info;

use dealbird_digest::config::AppConfig;
use dealbird_digest::services::ingest;
use dealbird_digest::store;

/// Ingest the deals feed at `path` and log the tally.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the feed cannot be read,
/// or a storage operation fails.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let store = store::connect(&config.storage).await?;
    let result = ingest::ingest_deals_from_file(store.as_ref(), path).await;
    store.close().await;

    let report = result?;

    info!("Ingestion summary");
    info!(
        "  Retailers: {} new, {} existing",
        report.retailers.inserted, report.retailers.existing
    );
    info!(
        "  Products:  {} new, {} existing",
        report.products.inserted, report.products.existing
    );
    info!(
        "  Deals:     {} new, {} skipped (duplicates)",
        report.deals.inserted, report.deals.skipped
    );

    Ok(())
}
