//! Storage entities.
//!
//! These are the persisted shapes. Identity rules:
//! - `Retailer` is unique by name
//! - `Product` is unique by (name, size)
//! - `Deal` is unique by (retailer, product, start date) - the dedup key
//! - `User` is unique by email
//!
//! Entities are created once on first sight and never mutated or deleted by
//! the batch run.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{DealId, ProductId, RetailerId, UserId};

/// A store that publishes deals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retailer {
    pub id: RetailerId,
    pub name: String,
}

/// A product as it appears in deal feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Package size, part of the product identity ("Milk 1L" and
    /// "Milk 2L" are different products).
    pub size: String,
    pub category: String,
}

/// A priced offer for one product at one retailer over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub retailer_id: RetailerId,
    pub product_id: ProductId,
    pub price: Decimal,
    /// First valid day, inclusive.
    pub start_date: NaiveDate,
    /// Last valid day, inclusive.
    pub end_date: NaiveDate,
}

impl Deal {
    /// Whether the deal's date range contains `today`, both endpoints
    /// inclusive.
    #[must_use]
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.start_date <= today && today <= self.end_date
    }
}

/// A digest subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    /// Retailer names this user wants deals from. Order is preserved from
    /// seeding but irrelevant for matching.
    pub preferred_retailers: Vec<String>,
}

impl User {
    /// Display first name: everything before the first space, or the whole
    /// name when there is none.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or(&self.name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn deal(start: NaiveDate, end: NaiveDate) -> Deal {
        Deal {
            id: DealId::new(1),
            retailer_id: RetailerId::new(1),
            product_id: ProductId::new(1),
            price: Decimal::new(350, 2),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_active_endpoints_inclusive() {
        let d = deal(date(2024, 1, 1), date(2024, 1, 7));
        assert!(d.is_active_on(date(2024, 1, 1)));
        assert!(d.is_active_on(date(2024, 1, 7)));
        assert!(d.is_active_on(date(2024, 1, 4)));
    }

    #[test]
    fn test_inactive_outside_range() {
        let d = deal(date(2024, 1, 1), date(2024, 1, 7));
        assert!(!d.is_active_on(date(2023, 12, 31)));
        assert!(!d.is_active_on(date(2024, 1, 8)));
    }

    #[test]
    fn test_first_name() {
        let mut user = User {
            id: UserId::new(1),
            name: "Jane Doe".to_owned(),
            email: Email::parse("jane@example.com").unwrap(),
            preferred_retailers: vec![],
        };
        assert_eq!(user.first_name(), "Jane");

        user.name = "Cher".to_owned();
        assert_eq!(user.first_name(), "Cher");
    }
}
