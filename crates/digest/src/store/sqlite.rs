//! Embedded SQLite backend.
//!
//! The schema is created on connect, so pointing the store at a fresh file
//! is all the setup there is. Prices are stored as integer cents: exact,
//! and `ORDER BY` works without caring about text collation. Dates are ISO
//! `YYYY-MM-DD` text, which compares correctly as text.

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};

use dealbird_core::{
    Deal, DealId, Email, EnrichedDeal, Product, ProductId, Retailer, RetailerId, User, UserId,
};

use super::{DealStore, StoreError, unique_conflict};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS retailers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    size TEXT NOT NULL,
    category TEXT NOT NULL,
    UNIQUE (name, size)
);

CREATE TABLE IF NOT EXISTS deals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    retailer_id INTEGER NOT NULL REFERENCES retailers(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    price_cents INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    UNIQUE (retailer_id, product_id, start_date)
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    preferred_retailers TEXT NOT NULL
);
";

/// Embedded file-based store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the parent directory or database file cannot
    /// be created, or schema creation fails.
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        // One connection: the run is a sequential batch job, and a larger
        // pool would split an in-memory database across connections.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Open a private in-memory database. Intended for tests.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the connection or schema creation fails.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect(Path::new(":memory:")).await
    }
}

fn price_to_cents(price: Decimal) -> Result<i64, StoreError> {
    (price * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| StoreError::Corrupt(format!("price out of range: {price}")))
}

fn price_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn decode_user(row: &SqliteRow) -> Result<User, StoreError> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email)
        .map_err(|e| StoreError::Corrupt(format!("invalid email in storage: {e}")))?;

    let preferred: String = row.try_get("preferred_retailers")?;
    let preferred_retailers: Vec<String> = serde_json::from_str(&preferred)
        .map_err(|e| StoreError::Corrupt(format!("invalid preferred retailers: {e}")))?;

    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email,
        preferred_retailers,
    })
}

fn decode_enriched_deal(row: &SqliteRow) -> Result<EnrichedDeal, StoreError> {
    Ok(EnrichedDeal {
        id: DealId::new(row.try_get("id")?),
        retailer_name: row.try_get("retailer_name")?,
        product_name: row.try_get("product_name")?,
        size: row.try_get("size")?,
        category: row.try_get("category")?,
        price: price_from_cents(row.try_get("price_cents")?),
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
    })
}

#[async_trait]
impl DealStore for SqliteStore {
    async fn retailer_by_name(&self, name: &str) -> Result<Option<Retailer>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM retailers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            Ok::<_, sqlx::Error>(Retailer {
                id: RetailerId::new(r.try_get("id")?),
                name: r.try_get("name")?,
            })
        })
        .transpose()?)
    }

    async fn insert_retailer(&self, name: &str) -> Result<Retailer, StoreError> {
        let id: i64 = sqlx::query_scalar("INSERT INTO retailers (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_conflict(e, "retailer name"))?;

        Ok(Retailer {
            id: RetailerId::new(id),
            name: name.to_owned(),
        })
    }

    async fn product_by_name_and_size(
        &self,
        name: &str,
        size: &str,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, size, category FROM products WHERE name = ? AND size = ?",
        )
        .bind(name)
        .bind(size)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| {
            Ok::<_, sqlx::Error>(Product {
                id: ProductId::new(r.try_get("id")?),
                name: r.try_get("name")?,
                size: r.try_get("size")?,
                category: r.try_get("category")?,
            })
        })
        .transpose()?)
    }

    async fn insert_product(
        &self,
        name: &str,
        size: &str,
        category: &str,
    ) -> Result<Product, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, size, category) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(size)
        .bind(category)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "product name and size"))?;

        Ok(Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            size: size.to_owned(),
            category: category.to_owned(),
        })
    }

    async fn deal_by_key(
        &self,
        retailer_id: RetailerId,
        product_id: ProductId,
        start_date: NaiveDate,
    ) -> Result<Option<Deal>, StoreError> {
        let row = sqlx::query(
            "SELECT id, retailer_id, product_id, price_cents, start_date, end_date
             FROM deals
             WHERE retailer_id = ? AND product_id = ? AND start_date = ?",
        )
        .bind(retailer_id.as_i64())
        .bind(product_id.as_i64())
        .bind(start_date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(Deal {
                id: DealId::new(r.try_get("id")?),
                retailer_id: RetailerId::new(r.try_get("retailer_id")?),
                product_id: ProductId::new(r.try_get("product_id")?),
                price: price_from_cents(r.try_get("price_cents")?),
                start_date: r.try_get("start_date")?,
                end_date: r.try_get("end_date")?,
            })
        })
        .transpose()
    }

    async fn insert_deal(
        &self,
        retailer_id: RetailerId,
        product_id: ProductId,
        price: Decimal,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Deal, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO deals (retailer_id, product_id, price_cents, start_date, end_date)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(retailer_id.as_i64())
        .bind(product_id.as_i64())
        .bind(price_to_cents(price)?)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "deal for retailer, product and start date"))?;

        Ok(Deal {
            id: DealId::new(id),
            retailer_id,
            product_id,
            price,
            start_date,
            end_date,
        })
    }

    async fn active_deals_for_retailers(
        &self,
        retailer_names: &[String],
        today: NaiveDate,
    ) -> Result<Vec<EnrichedDeal>, StoreError> {
        if retailer_names.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT d.id, r.name AS retailer_name, p.name AS product_name,
                    p.size, p.category, d.price_cents, d.start_date, d.end_date
             FROM deals d
             JOIN retailers r ON r.id = d.retailer_id
             JOIN products p ON p.id = d.product_id
             WHERE d.start_date <= ",
        );
        query.push_bind(today);
        query.push(" AND d.end_date >= ");
        query.push_bind(today);
        query.push(" AND r.name IN (");
        let mut names = query.separated(", ");
        for name in retailer_names {
            names.push_bind(name.as_str());
        }
        query.push(") ORDER BY d.price_cents ASC, d.id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_enriched_deal).collect()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, preferred_retailers FROM users WHERE email = ?",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(decode_user).transpose()
    }

    async fn insert_user(
        &self,
        name: &str,
        email: &Email,
        preferred_retailers: &[String],
    ) -> Result<User, StoreError> {
        let preferred = serde_json::to_string(preferred_retailers)
            .map_err(|e| StoreError::Corrupt(format!("unencodable preferred retailers: {e}")))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, preferred_retailers) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(name)
        .bind(email.as_str())
        .bind(&preferred)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_conflict(e, "user email"))?;

        Ok(User {
            id: UserId::new(id),
            name: name.to_owned(),
            email: email.clone(),
            preferred_retailers: preferred_retailers.to_vec(),
        })
    }

    async fn all_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, email, preferred_retailers FROM users ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_user).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
