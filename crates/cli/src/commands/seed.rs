//! Subscriber seeding command.

use std::path::Path;

use tracing::info;

use dealbird_digest::config::AppConfig;
use dealbird_digest::services::ingest;
use dealbird_digest::store;

/// Seed the users file at `path` and log the tally.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the file cannot be read,
/// or a storage operation fails.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let store = store::connect(&config.storage).await?;
    let result = ingest::seed_users_from_file(store.as_ref(), path).await;
    store.close().await;

    let report = result?;

    info!("Seeding summary");
    info!(
        "  Users: {} inserted, {} already existed",
        report.inserted, report.existing
    );

    Ok(())
}
