//! Single-table city persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

use crate::model::City;

/// Longest city name the table accepts.
pub const MAX_NAME_LEN: usize = 100;

#[async_trait]
pub trait CityStore: Send + Sync {
    async fn list(&self) -> Result<Vec<City>>;
    async fn get(&self, id: i64) -> Result<Option<City>>;
    async fn insert(&self, name: &str) -> Result<City>;
    /// `None` when no row has `id`.
    async fn update(&self, id: i64, name: &str) -> Result<Option<City>>;
    /// `false` when no row has `id`.
    async fn delete(&self, id: i64) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct SqliteCityStore {
    pool: SqlitePool,
}

impl SqliteCityStore {
    /// Open `url` and make sure the `cities` table exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database url: {url}"))?
            .create_if_missing(true);

        // An in-memory database lives and dies with its connection.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {url}"))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cities (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL CHECK (length(name) <= 100)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create cities table")?;
        Ok(())
    }
}

#[async_trait]
impl CityStore for SqliteCityStore {
    async fn list(&self) -> Result<Vec<City>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM cities ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list cities")?;

        Ok(rows.into_iter().map(|(id, name)| City { id, name }).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<City>> {
        let row: Option<(i64, String)> = sqlx::query_as("SELECT id, name FROM cities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load city {id}"))?;

        Ok(row.map(|(id, name)| City { id, name }))
    }

    async fn insert(&self, name: &str) -> Result<City> {
        let result = sqlx::query("INSERT INTO cities (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert city {name}"))?;

        Ok(City {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    async fn update(&self, id: i64, name: &str) -> Result<Option<City>> {
        let result = sqlx::query("UPDATE cities SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update city {id}"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(City {
            id,
            name: name.to_string(),
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete city {id}"))?;

        Ok(result.rows_affected() > 0)
    }
}
