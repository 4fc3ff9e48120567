//! Digest composition and delivery properties: active-date boundaries,
//! sorting and grouping policy, and per-user outcome recording.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use dealbird_core::{Email, User, UserId};
use dealbird_digest::config::BrandConfig;
use dealbird_digest::services::compose::compose_digest;
use dealbird_digest::services::delivery::{
    Mailer, NO_MATCHING_DEALS, preview_digest_html, send_weekly_digests,
};
use dealbird_digest::services::ingest::{ingest_deals, seed_users};
use dealbird_digest::store::DealStore;
use dealbird_integration_tests::{date, memory_store, raw_deal, raw_user};

fn user(name: &str, email: &str, preferred: &[&str]) -> User {
    User {
        id: UserId::new(1),
        name: name.to_owned(),
        email: Email::parse(email).unwrap(),
        preferred_retailers: preferred.iter().map(|&r| r.to_owned()).collect(),
    }
}

#[tokio::test]
async fn active_filter_includes_both_endpoints() {
    let store = memory_store().await;
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 7);

    ingest_deals(
        &store,
        &[raw_deal("A", "Milk", "1L", 350, start, end, "dairy")],
    )
    .await
    .unwrap();

    for today in [start, end] {
        let deals = store
            .active_deals_for_retailers(&["A".to_owned()], today)
            .await
            .unwrap();
        assert_eq!(deals.len(), 1, "deal should be active on {today}");
    }
}

#[tokio::test]
async fn expired_and_future_deals_are_excluded() {
    let store = memory_store().await;

    ingest_deals(
        &store,
        &[raw_deal(
            "A",
            "Milk",
            "1L",
            350,
            date(2024, 1, 1),
            date(2024, 1, 7),
            "dairy",
        )],
    )
    .await
    .unwrap();

    // The day after end_date.
    let deals = store
        .active_deals_for_retailers(&["A".to_owned()], date(2024, 1, 8))
        .await
        .unwrap();
    assert!(deals.is_empty());

    // The day before start_date.
    let deals = store
        .active_deals_for_retailers(&["A".to_owned()], date(2023, 12, 31))
        .await
        .unwrap();
    assert!(deals.is_empty());
}

#[tokio::test]
async fn compose_matches_the_spec_example() {
    let store = memory_store().await;
    let today = date(2024, 1, 3);

    ingest_deals(
        &store,
        &[raw_deal(
            "A",
            "Milk",
            "1L",
            350,
            date(2024, 1, 1),
            date(2024, 1, 7),
            "dairy",
        )],
    )
    .await
    .unwrap();

    let jane = user("Jane Doe", "jane@example.com", &["A"]);
    let data = compose_digest(&store, &jane, today).await.unwrap().unwrap();

    assert_eq!(data.user_name, "Jane");
    assert_eq!(data.top_deals.len(), 1);
    assert_eq!(data.deals_by_retailer.len(), 1);
    assert_eq!(data.deals_by_retailer.first().unwrap().retailer, "A");
    assert_eq!(data.deals_by_retailer.first().unwrap().deals.len(), 1);
    assert_eq!(
        data.top_deals.first().unwrap().price,
        Decimal::new(350, 2)
    );
}

#[tokio::test]
async fn top_deals_are_price_ascending() {
    let store = memory_store().await;
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 7);
    let today = date(2024, 1, 3);

    ingest_deals(
        &store,
        &[
            raw_deal("B", "Steak", "500g", 1299, start, end, "protein"),
            raw_deal("A", "Bread", "1pc", 199, start, end, "bakery"),
            raw_deal("A", "Eggs", "12ct", 420, start, end, "protein"),
        ],
    )
    .await
    .unwrap();

    let shopper = user("Sam Lee", "sam@example.com", &["A", "B"]);
    let data = compose_digest(&store, &shopper, today)
        .await
        .unwrap()
        .unwrap();

    let prices: Vec<_> = data.top_deals.iter().map(|d| d.price).collect();
    let mut sorted = prices.clone();
    sorted.sort();
    assert_eq!(prices, sorted);
    assert_eq!(prices.first().unwrap(), &Decimal::new(199, 2));
}

#[tokio::test]
async fn retailer_partitions_are_ordered_and_price_sorted() {
    let store = memory_store().await;
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 7);

    ingest_deals(
        &store,
        &[
            raw_deal("Zest Mart", "Milk", "1L", 350, start, end, "dairy"),
            raw_deal("Acme", "Steak", "500g", 1299, start, end, "protein"),
            raw_deal("Acme", "Bread", "1pc", 199, start, end, "bakery"),
        ],
    )
    .await
    .unwrap();

    let shopper = user("Sam Lee", "sam@example.com", &["Acme", "Zest Mart"]);
    let data = compose_digest(&store, &shopper, date(2024, 1, 3))
        .await
        .unwrap()
        .unwrap();

    let retailers: Vec<_> = data
        .deals_by_retailer
        .iter()
        .map(|g| g.retailer.as_str())
        .collect();
    assert_eq!(retailers, vec!["Acme", "Zest Mart"]);

    let acme = data.deals_by_retailer.first().unwrap();
    let acme_prices: Vec<_> = acme.deals.iter().map(|d| d.price).collect();
    assert_eq!(
        acme_prices,
        vec![Decimal::new(199, 2), Decimal::new(1299, 2)]
    );
}

#[tokio::test]
async fn empty_preference_set_means_no_digest() {
    let store = memory_store().await;

    ingest_deals(
        &store,
        &[raw_deal(
            "A",
            "Milk",
            "1L",
            350,
            date(2024, 1, 1),
            date(2024, 1, 7),
            "dairy",
        )],
    )
    .await
    .unwrap();

    let loner = user("Pat Quinn", "pat@example.com", &[]);
    let digest = compose_digest(&store, &loner, date(2024, 1, 3)).await.unwrap();
    assert!(digest.is_none());
}

#[tokio::test]
async fn unmatched_user_is_recorded_and_others_still_send() {
    let store = memory_store().await;
    let today = date(2024, 1, 3);

    ingest_deals(
        &store,
        &[raw_deal(
            "A",
            "Milk",
            "1L",
            350,
            date(2024, 1, 1),
            date(2024, 1, 7),
            "dairy",
        )],
    )
    .await
    .unwrap();

    // First user prefers a retailer with no deals; the second matches.
    seed_users(
        &store,
        &[
            raw_user("Pat Quinn", "pat@example.com", &["Nowhere Foods"]),
            raw_user("Jane Doe", "jane@example.com", &["A"]),
        ],
    )
    .await
    .unwrap();

    let outcomes = send_weekly_digests(&store, &Mailer::Console, &BrandConfig::default(), today)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);

    let pat = outcomes.first().unwrap();
    assert!(!pat.success);
    assert_eq!(pat.deals_count, 0);
    assert_eq!(pat.error.as_deref(), Some(NO_MATCHING_DEALS));

    let jane = outcomes.get(1).unwrap();
    assert!(jane.success);
    assert_eq!(jane.deals_count, 1);
    assert!(jane.error.is_none());
}

#[tokio::test]
async fn no_users_yields_no_outcomes() {
    let store = memory_store().await;

    let outcomes = send_weekly_digests(
        &store,
        &Mailer::Console,
        &BrandConfig::default(),
        date(2024, 1, 3),
    )
    .await
    .unwrap();

    assert!(outcomes.is_empty());
}

#[tokio::test]
async fn preview_renders_html_for_named_user() {
    let store = memory_store().await;
    let today = date(2024, 1, 3);

    ingest_deals(
        &store,
        &[raw_deal(
            "A",
            "Milk",
            "1L",
            350,
            date(2024, 1, 1),
            date(2024, 1, 7),
            "dairy",
        )],
    )
    .await
    .unwrap();
    seed_users(&store, &[raw_user("Jane Doe", "jane@example.com", &["A"])])
        .await
        .unwrap();

    let html = preview_digest_html(&store, Some("jane@example.com"), &BrandConfig::default(), today)
        .await
        .unwrap()
        .unwrap();

    assert!(html.contains("Hi <strong>Jane</strong>"));
    assert!(html.contains("$3.50"));

    let missing =
        preview_digest_html(&store, Some("nobody@example.com"), &BrandConfig::default(), today)
            .await
            .unwrap();
    assert!(missing.is_none());
}
