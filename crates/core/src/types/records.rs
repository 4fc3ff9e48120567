//! Raw input records as they appear in the JSON feed files.
//!
//! Field names match the feed format exactly, so these types deserialize the
//! input files without rename attributes. They are untrusted input shapes -
//! the ingestion service turns them into storage entities.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::email::Email;

/// One deal row from the weekly deals feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDeal {
    /// Retailer display name, the retailer's unique key.
    pub retailer: String,
    /// Product display name; unique together with `size`.
    pub product: String,
    /// Package size, e.g. "1L" or "500g".
    pub size: String,
    /// Sale price in the store currency.
    pub price: Decimal,
    /// First day the deal is valid (inclusive).
    pub start: NaiveDate,
    /// Last day the deal is valid (inclusive).
    pub end: NaiveDate,
    /// Product category, e.g. "dairy" or "produce".
    pub category: String,
}

/// One subscriber row from the users seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    /// Full display name.
    pub name: String,
    /// Unique subscriber email.
    pub email: Email,
    /// Names of the retailers this user wants deals from.
    pub preferred_retailers: Vec<String>,
}
