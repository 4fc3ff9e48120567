//! Shared fixtures for the Dealbird integration tests.
//!
//! Tests run the real services against the embedded backend with a private
//! in-memory database per test, so they exercise the same SQL the batch run
//! uses without touching the filesystem.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use dealbird_core::{RawDeal, RawUser};
use dealbird_digest::store::SqliteStore;

/// A fresh in-memory store with the schema created.
///
/// # Panics
///
/// Panics if the in-memory database cannot be opened.
pub async fn memory_store() -> SqliteStore {
    SqliteStore::in_memory().await.unwrap()
}

/// Shorthand for a calendar date.
///
/// # Panics
///
/// Panics on an invalid date.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// A raw deal record with a price given in cents.
#[must_use]
pub fn raw_deal(
    retailer: &str,
    product: &str,
    size: &str,
    price_cents: i64,
    start: NaiveDate,
    end: NaiveDate,
    category: &str,
) -> RawDeal {
    RawDeal {
        retailer: retailer.to_owned(),
        product: product.to_owned(),
        size: size.to_owned(),
        price: Decimal::new(price_cents, 2),
        start,
        end,
        category: category.to_owned(),
    }
}

/// A raw user record.
///
/// # Panics
///
/// Panics on an invalid email.
#[must_use]
pub fn raw_user(name: &str, email: &str, preferred_retailers: &[&str]) -> RawUser {
    RawUser {
        name: name.to_owned(),
        email: email.parse().unwrap(),
        preferred_retailers: preferred_retailers.iter().map(|&r| r.to_owned()).collect(),
    }
}
