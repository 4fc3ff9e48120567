//! The weekly pipeline: ingest the feed, then compose and deliver every
//! subscriber's digest.

use std::path::Path;

use chrono::Utc;
use tracing::info;

use dealbird_digest::config::{AppConfig, EmailConfig};
use dealbird_digest::services::delivery::{Mailer, log_send_summary, send_weekly_digests};
use dealbird_digest::services::ingest;
use dealbird_digest::store;

/// Run the weekly batch.
///
/// `skip_ingest` and `skip_send` drop the respective step; `dry_run` forces
/// the console channel regardless of the configured provider.
///
/// # Errors
///
/// Returns an error on configuration, ingestion, or storage failure.
/// Per-user delivery failures are recorded in the summary, not returned.
pub async fn run(
    deals_path: &Path,
    skip_ingest: bool,
    skip_send: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;

    if dry_run {
        info!("Dry run: digests go to the console");
        config.email = EmailConfig::Console;
    }

    // Build the channel before touching storage so a bad SMTP config fails
    // the run up front.
    let mailer = Mailer::from_config(&config.email)?;
    let today = Utc::now().date_naive();

    let store = store::connect(&config.storage).await?;

    let result = async {
        if skip_ingest {
            info!("Skipping ingestion (--skip-ingest)");
        } else {
            let report = ingest::ingest_deals_from_file(store.as_ref(), deals_path).await?;
            info!(
                "Ingested: {} retailers, {} products, {} deals ({} duplicates skipped)",
                report.retailers.inserted,
                report.products.inserted,
                report.deals.inserted,
                report.deals.skipped
            );
        }

        if skip_send {
            info!("Skipping delivery (--skip-send)");
        } else {
            let outcomes =
                send_weekly_digests(store.as_ref(), &mailer, &config.brand, today).await?;
            log_send_summary(&outcomes);
        }

        Ok::<(), Box<dyn std::error::Error>>(())
    }
    .await;

    store.close().await;
    result
}
