//! Digest preview command: render one user's HTML without sending.

use std::path::Path;

use chrono::Utc;
use tracing::info;

use dealbird_digest::config::AppConfig;
use dealbird_digest::services::delivery::preview_digest_html;
use dealbird_digest::services::ingest;
use dealbird_digest::store;

/// Render the digest for `user_email` (or the first user) and write the HTML
/// to `output`. With `deals_path` set, ingests that feed first so the
/// preview has data.
///
/// # Errors
///
/// Returns an error if configuration, storage, or rendering fails, or when
/// there is nothing to preview.
pub async fn run(
    user_email: Option<&str>,
    output: &Path,
    deals_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let today = Utc::now().date_naive();

    let store = store::connect(&config.storage).await?;

    let result = async {
        if let Some(path) = deals_path {
            ingest::ingest_deals_from_file(store.as_ref(), path).await?;
        }

        let html = preview_digest_html(store.as_ref(), user_email, &config.brand, today).await?;
        Ok::<_, Box<dyn std::error::Error>>(html)
    }
    .await;

    store.close().await;

    let Some(html) = result? else {
        return Err("nothing to preview: user not found or no matching deals".into());
    };

    tokio::fs::write(output, &html).await?;
    info!(path = %output.display(), "Preview saved");

    Ok(())
}
