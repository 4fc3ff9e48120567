//! Hosted Postgres backend.
//!
//! Logically identical to the SQLite backend: same tables, same UNIQUE
//! constraints, same query semantics. Prices map to `NUMERIC(10,2)` and
//! dates to `DATE`, so no boundary conversion is needed.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use dealbird_core::{
    Deal, DealId, Email, EnrichedDeal, Product, ProductId, Retailer, RetailerId, User, UserId,
};

use super::{DealStore, StoreError, unique_conflict};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS retailers (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS products (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    name TEXT NOT NULL,
    size TEXT NOT NULL,
    category TEXT NOT NULL,
    UNIQUE (name, size)
);

CREATE TABLE IF NOT EXISTS deals (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    retailer_id BIGINT NOT NULL REFERENCES retailers(id),
    product_id BIGINT NOT NULL REFERENCES products(id),
    price NUMERIC(10,2) NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    UNIQUE (retailer_id, product_id, start_date)
);

CREATE TABLE IF NOT EXISTS users (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    preferred_retailers TEXT NOT NULL
);
";

/// Hosted relational store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the connection cannot be established or
    /// schema creation fails.
    pub async fn connect(database_url: &SecretString) -> Result<Self, StoreError> {
        // One connection: the run is a sequential batch job.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url.expose_secret())
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Drop every Dealbird table. Used by the CLI `reset` command only.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the drop fails.
    pub async fn drop_all_tables(&self) -> Result<(), StoreError> {
        sqlx::raw_sql("DROP TABLE IF EXISTS deals, products, retailers, users")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn decode_user(row: &PgRow) -> Result<User, StoreError> {
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

fn decode_enriched_deal(row: &PgRow) -> Result<EnrichedDeal, StoreError> {
    Ok(EnrichedDeal {
        id: DealId::new(row.try_get("id")?),
        retailer_name: row.try_get("retailer_name")?,
        product_name: row.try_get("product_name")?,
        size: row.try_get("size")?,
        category: row.try_get("category")?,
        price: row.try_get("price")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
    })
}

#[async_trait]
impl DealStore for PgStore {
    async fn retailer_by_name(&self, name: &str) -> Result<Option<Retailer>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM retailers WHERE name = $1")
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
        let id: i64 = sqlx::query_scalar("INSERT INTO retailers (name) VALUES ($1) RETURNING id")
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
            "SELECT id, name, size, category FROM products WHERE name = $1 AND size = $2",
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
            "INSERT INTO products (name, size, category) VALUES ($1, $2, $3) RETURNING id",
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
            "SELECT id, retailer_id, product_id, price, start_date, end_date
             FROM deals
             WHERE retailer_id = $1 AND product_id = $2 AND start_date = $3",
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
                price: r.try_get("price")?,
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
            "INSERT INTO deals (retailer_id, product_id, price, start_date, end_date)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(retailer_id.as_i64())
        .bind(product_id.as_i64())
        .bind(price)
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

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT d.id, r.name AS retailer_name, p.name AS product_name,
                    p.size, p.category, d.price, d.start_date, d.end_date
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
        query.push(") ORDER BY d.price ASC, d.id ASC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(decode_enriched_deal).collect()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, preferred_retailers FROM users WHERE email = $1",
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
            "INSERT INTO users (name, email, preferred_retailers) VALUES ($1, $2, $3) RETURNING id",
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
