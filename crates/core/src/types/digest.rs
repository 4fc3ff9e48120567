//! Digest views: the joined deal shape and the composed email payload.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::email::Email;
use super::id::DealId;

/// A deal joined with its retailer and product, as returned by the
/// active-deal query. This is the only shape the email pipeline sees.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedDeal {
    pub id: DealId,
    pub retailer_name: String,
    pub product_name: String,
    pub size: String,
    pub category: String,
    pub price: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// One retailer's partition of a user's matching deals, price-ascending.
#[derive(Debug, Clone, Serialize)]
pub struct RetailerDeals {
    pub retailer: String,
    pub deals: Vec<EnrichedDeal>,
}

/// Everything the renderer needs for one user's digest email.
///
/// `top_deals` and `deals_by_retailer` are two projections of the same
/// `deals` fetch, so the highlight section and the per-store list can never
/// disagree about which deals exist.
#[derive(Debug, Clone, Serialize)]
pub struct EmailData {
    /// Recipient address.
    pub to: Email,
    /// Display first name for the greeting.
    pub user_name: String,
    /// The matching active deals, in fetch order.
    pub deals: Vec<EnrichedDeal>,
    /// Deals partitioned by retailer name (lexicographic ascending), each
    /// partition price-ascending.
    pub deals_by_retailer: Vec<RetailerDeals>,
    /// All matching deals sorted by price ascending, cheapest first.
    pub top_deals: Vec<EnrichedDeal>,
}
