use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::WatchedAddress;

use super::MIGRATION_001_INITIAL;

/// Storage for per-user watch lists, keyed by (user, address).
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Insert a new entry. Returns false, leaving the stored row untouched,
    /// when the (user, address) pair already exists.
    async fn save_address(&self, user_id: &str, entry: &WatchedAddress) -> Result<bool>;

    async fn get_address(&self, user_id: &str, address: &str) -> Result<Option<WatchedAddress>>;

    /// All of a user's entries, ordered by address.
    async fn list_addresses(&self, user_id: &str) -> Result<Vec<WatchedAddress>>;

    /// Returns false when there was no such entry.
    async fn update_label(
        &self,
        user_id: &str,
        address: &str,
        label: Option<&str>,
    ) -> Result<bool>;

    /// Returns false when there was no such entry.
    async fn delete_address(&self, user_id: &str, address: &str) -> Result<bool>;
}

/// SQLite-backed [`AddressRepository`].
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    fn row_to_address(row: &sqlx::sqlite::SqliteRow) -> Result<WatchedAddress> {
        let created_at_str: String = row.get("created_at");

        Ok(WatchedAddress {
            address: row.get("address"),
            label: row.get("label"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl AddressRepository for Repository {
    async fn save_address(&self, user_id: &str, entry: &WatchedAddress) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO watched_addresses (user_id, address, label, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id, address) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(&entry.address)
        .bind(&entry.label)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save address")?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_address(&self, user_id: &str, address: &str) -> Result<Option<WatchedAddress>> {
        let row = sqlx::query(
            r#"
            SELECT address, label, created_at
            FROM watched_addresses
            WHERE user_id = ? AND address = ?
            "#,
        )
        .bind(user_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch address")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_address(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_addresses(&self, user_id: &str) -> Result<Vec<WatchedAddress>> {
        let rows = sqlx::query(
            r#"
            SELECT address, label, created_at
            FROM watched_addresses
            WHERE user_id = ?
            ORDER BY address
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list addresses")?;

        rows.iter().map(Self::row_to_address).collect()
    }

    async fn update_label(
        &self,
        user_id: &str,
        address: &str,
        label: Option<&str>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE watched_addresses SET label = ? WHERE user_id = ? AND address = ?")
                .bind(label)
                .bind(user_id)
                .bind(address)
                .execute(&self.pool)
                .await
                .context("Failed to update label")?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_address(&self, user_id: &str, address: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watched_addresses WHERE user_id = ? AND address = ?")
            .bind(user_id)
            .bind(address)
            .execute(&self.pool)
            .await
            .context("Failed to delete address")?;
        Ok(result.rows_affected() > 0)
    }
}
