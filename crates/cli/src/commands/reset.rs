//! Storage reset command. Destructive.

use tracing::{info, warn};

use dealbird_digest::config::{AppConfig, StorageConfig};
use dealbird_digest::store::{DealStore, PgStore};

/// Drop all stored data for the configured backend.
///
/// SQLite: delete the database file. Postgres: drop the four tables.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the reset fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    match &config.storage {
        StorageConfig::Sqlite { path } => {
            if tokio::fs::try_exists(path).await? {
                tokio::fs::remove_file(path).await?;
                warn!(path = %path.display(), "Deleted SQLite database");
            } else {
                info!(path = %path.display(), "No database file found");
            }
        }
        StorageConfig::Postgres { database_url } => {
            let store = PgStore::connect(database_url).await?;
            let result = store.drop_all_tables().await;
            store.close().await;
            result?;
            warn!("Dropped all Dealbird tables");
        }
    }

    info!("Run `dealbird seed` and `dealbird ingest` to repopulate");
    Ok(())
}
