//! Ingestion pipeline properties: idempotent upserts and composite-key
//! dedup over the embedded backend.

#![allow(clippy::unwrap_used)]

use dealbird_core::Email;
use dealbird_digest::services::ingest::{ingest_deals, seed_users};
use dealbird_digest::store::DealStore;
use dealbird_integration_tests::{date, memory_store, raw_deal, raw_user};

#[tokio::test]
async fn empty_feed_yields_zero_tally() {
    let store = memory_store().await;

    let report = ingest_deals(&store, &[]).await.unwrap();

    assert_eq!(report.retailers.inserted, 0);
    assert_eq!(report.retailers.existing, 0);
    assert_eq!(report.products.inserted, 0);
    assert_eq!(report.products.existing, 0);
    assert_eq!(report.deals.inserted, 0);
    assert_eq!(report.deals.skipped, 0);
}

#[tokio::test]
async fn first_ingest_inserts_everything() {
    let store = memory_store().await;
    let feed = vec![raw_deal(
        "A",
        "Milk",
        "1L",
        350,
        date(2024, 1, 1),
        date(2024, 1, 7),
        "dairy",
    )];

    let report = ingest_deals(&store, &feed).await.unwrap();

    assert_eq!(report.retailers.inserted, 1);
    assert_eq!(report.products.inserted, 1);
    assert_eq!(report.deals.inserted, 1);
    assert_eq!(report.deals.skipped, 0);
}

#[tokio::test]
async fn second_ingest_is_a_no_op() {
    let store = memory_store().await;
    let feed = vec![raw_deal(
        "A",
        "Milk",
        "1L",
        350,
        date(2024, 1, 1),
        date(2024, 1, 7),
        "dairy",
    )];

    ingest_deals(&store, &feed).await.unwrap();
    let report = ingest_deals(&store, &feed).await.unwrap();

    assert_eq!(report.retailers.inserted, 0);
    assert_eq!(report.retailers.existing, 1);
    assert_eq!(report.products.inserted, 0);
    assert_eq!(report.products.existing, 1);
    assert_eq!(report.deals.inserted, 0);
    assert_eq!(report.deals.skipped, 1);
}

#[tokio::test]
async fn duplicate_key_skips_even_when_price_differs() {
    let store = memory_store().await;
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 7);

    ingest_deals(
        &store,
        &[raw_deal("A", "Milk", "1L", 350, start, end, "dairy")],
    )
    .await
    .unwrap();

    // Same (retailer, product, start) triple, corrected price and end date.
    let report = ingest_deals(
        &store,
        &[raw_deal("A", "Milk", "1L", 299, start, date(2024, 1, 14), "dairy")],
    )
    .await
    .unwrap();

    assert_eq!(report.deals.inserted, 0);
    assert_eq!(report.deals.skipped, 1);

    // The stored record is untouched.
    let retailer = store.retailer_by_name("A").await.unwrap().unwrap();
    let product = store
        .product_by_name_and_size("Milk", "1L")
        .await
        .unwrap()
        .unwrap();
    let deal = store
        .deal_by_key(retailer.id, product.id, start)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deal.price, rust_decimal::Decimal::new(350, 2));
    assert_eq!(deal.end_date, end);
}

#[tokio::test]
async fn same_triple_with_new_start_date_is_a_new_deal() {
    let store = memory_store().await;
    let end = date(2024, 1, 21);

    ingest_deals(
        &store,
        &[raw_deal("A", "Milk", "1L", 350, date(2024, 1, 1), end, "dairy")],
    )
    .await
    .unwrap();

    let report = ingest_deals(
        &store,
        &[raw_deal("A", "Milk", "1L", 350, date(2024, 1, 8), end, "dairy")],
    )
    .await
    .unwrap();

    assert_eq!(report.deals.inserted, 1);
    assert_eq!(report.deals.skipped, 0);
}

#[tokio::test]
async fn retailer_and_product_upserts_are_decoupled() {
    let store = memory_store().await;
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 7);

    ingest_deals(
        &store,
        &[raw_deal("A", "Milk", "1L", 350, start, end, "dairy")],
    )
    .await
    .unwrap();

    // Existing retailer, brand-new product.
    let report = ingest_deals(
        &store,
        &[raw_deal("A", "Eggs", "12ct", 420, start, end, "protein")],
    )
    .await
    .unwrap();

    assert_eq!(report.retailers.inserted, 0);
    assert_eq!(report.retailers.existing, 1);
    assert_eq!(report.products.inserted, 1);
    assert_eq!(report.deals.inserted, 1);
}

#[tokio::test]
async fn product_identity_includes_size() {
    let store = memory_store().await;
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 7);

    let report = ingest_deals(
        &store,
        &[
            raw_deal("A", "Milk", "1L", 350, start, end, "dairy"),
            raw_deal("A", "Milk", "2L", 599, start, end, "dairy"),
        ],
    )
    .await
    .unwrap();

    assert_eq!(report.products.inserted, 2);
    assert_eq!(report.deals.inserted, 2);
}

#[tokio::test]
async fn seeding_users_is_idempotent() {
    let store = memory_store().await;
    let users = vec![
        raw_user("Jane Doe", "jane@example.com", &["A"]),
        raw_user("Sam Lee", "sam@example.com", &["B"]),
    ];

    let first = seed_users(&store, &users).await.unwrap();
    assert_eq!(first.inserted, 2);
    assert_eq!(first.existing, 0);

    let second = seed_users(&store, &users).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.existing, 2);
}

#[tokio::test]
async fn reseeding_never_updates_an_existing_user() {
    let store = memory_store().await;

    seed_users(&store, &[raw_user("Jane Doe", "jane@example.com", &["A"])])
        .await
        .unwrap();

    // Same email, different name and preferences.
    seed_users(
        &store,
        &[raw_user("Jane Smith", "jane@example.com", &["B", "C"])],
    )
    .await
    .unwrap();

    let email = Email::parse("jane@example.com").unwrap();
    let user = store.user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(user.name, "Jane Doe");
    assert_eq!(user.preferred_retailers, vec!["A"]);
}

#[tokio::test]
async fn sqlite_file_store_persists_across_reopen() {
    use dealbird_digest::store::SqliteStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dealbird.db");

    {
        let store = SqliteStore::connect(&path).await.unwrap();
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
        store.close().await;
    }

    let store = SqliteStore::connect(&path).await.unwrap();
    let report = ingest_deals(
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
    store.close().await;

    assert_eq!(report.deals.skipped, 1);
}
