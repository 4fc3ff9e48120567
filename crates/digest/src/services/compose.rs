//! Digest composition: match, sort, and group one user's active deals.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use dealbird_core::{EmailData, EnrichedDeal, RetailerDeals, User};

use crate::store::{DealStore, StoreError};

/// Compose the digest for one user, or `None` when no active deal matches
/// their preferred retailers (including the empty-preference case). The
/// caller must suppress sending on `None` - an empty email is never sent.
///
/// Both digest views are projections of a single fetch, so they can never
/// disagree about which deals exist.
///
/// # Errors
///
/// Returns `StoreError` if the active-deal query fails.
pub async fn compose_digest(
    store: &dyn DealStore,
    user: &User,
    today: NaiveDate,
) -> Result<Option<EmailData>, StoreError> {
    let deals = store
        .active_deals_for_retailers(&user.preferred_retailers, today)
        .await?;

    if deals.is_empty() {
        debug!(email = %user.email, "No active deals for preferred retailers");
        return Ok(None);
    }

    let mut top_deals = deals.clone();
    // Stable: equal prices keep fetch order.
    top_deals.sort_by(|a, b| a.price.cmp(&b.price));

    let deals_by_retailer = group_by_retailer(&deals);

    Ok(Some(EmailData {
        to: user.email.clone(),
        user_name: user.first_name().to_owned(),
        deals,
        deals_by_retailer,
        top_deals,
    }))
}

/// Partition deals by retailer name. Partitions come out ordered by retailer
/// name ascending; within each partition deals are price-ascending.
#[must_use]
pub fn group_by_retailer(deals: &[EnrichedDeal]) -> Vec<RetailerDeals> {
    let mut grouped: BTreeMap<&str, Vec<EnrichedDeal>> = BTreeMap::new();

    for deal in deals {
        grouped
            .entry(deal.retailer_name.as_str())
            .or_default()
            .push(deal.clone());
    }

    grouped
        .into_iter()
        .map(|(retailer, mut deals)| {
            deals.sort_by(|a, b| a.price.cmp(&b.price));
            RetailerDeals {
                retailer: retailer.to_owned(),
                deals,
            }
        })
        .collect()
}
