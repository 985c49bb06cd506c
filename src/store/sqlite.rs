//! SQLite-backed store.
//!
//! One table, one row per reading, each insert committed on its own so a
//! crash loses at most the in-flight reading.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use super::{PersistenceStore, READINGS_TABLE};
use crate::data::Reading;
use crate::error::StoreError;

/// A store that writes readings to a SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
    description: String,
    closed: bool,
}

impl SqliteStore {
    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let store = Self::connect(options, format!("sqlite: {}", path.display())).await?;
        info!("Opened reading store at {}", path.display());
        Ok(store)
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, "sqlite: memory".to_string()).await
    }

    async fn connect(options: SqliteConnectOptions, description: String) -> Result<Self, StoreError> {
        // An in-memory database lives only as long as its connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            description,
            closed: false,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {READINGS_TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp DATETIME,
                location TEXT,
                concentration FLOAT,
                risk_level TEXT
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Number of persisted rows.
    #[cfg(test)]
    async fn count(&self) -> Result<i64, StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {READINGS_TABLE}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// All persisted rows in insertion order.
    #[cfg(test)]
    async fn rows(&self) -> Result<Vec<super::StoredRow>, StoreError> {
        use super::StoredRow;
        use chrono::{DateTime, Utc};

        if self.closed {
            return Err(StoreError::Closed);
        }
        let rows = sqlx::query_as::<_, (DateTime<Utc>, String, f64, String)>(&format!(
            "SELECT timestamp, location, concentration, risk_level FROM {READINGS_TABLE} ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, location, concentration, risk_level)| StoredRow {
                timestamp,
                location,
                concentration,
                risk_level,
            })
            .collect())
    }
}

#[async_trait]
impl PersistenceStore for SqliteStore {
    async fn append(&mut self, reading: &Reading) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        sqlx::query(&format!(
            "INSERT INTO {READINGS_TABLE} (timestamp, location, concentration, risk_level) VALUES (?, ?, ?, ?)"
        ))
        .bind(reading.timestamp())
        .bind(reading.location())
        .bind(reading.concentration())
        .bind(reading.risk_tier().label())
        .execute(&self.pool)
        .await?;

        debug!("Persisted reading #{}", reading.sequence_index());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pool.close().await;
        info!("Closed reading store ({})", self.description);
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn reading(index: u64, concentration: f64) -> Reading {
        Reading::new(index, Utc::now(), "Plant room", concentration)
    }

    #[tokio::test]
    async fn test_append_persists_rows() {
        let mut store = SqliteStore::in_memory().await.unwrap();
        store.append(&reading(1, 0.005)).await.unwrap();
        store.append(&reading(2, 0.15)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        let rows = store.rows().await.unwrap();
        assert_eq!(rows[0].risk_level, "Low");
        assert_eq!(rows[1].risk_level, "High");
        assert_eq!(rows[1].location, "Plant room");
        assert!((rows[1].concentration - 0.15).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.db");

        let mut store = SqliteStore::open(&path).await.unwrap();
        store.append(&reading(1, 0.02)).await.unwrap();
        store.close().await.unwrap();

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.rows().await.unwrap()[0].risk_level, "Medium");
    }

    #[tokio::test]
    async fn test_append_after_close_fails() {
        let mut store = SqliteStore::in_memory().await.unwrap();
        store.close().await.unwrap();
        // Closing twice is harmless
        store.close().await.unwrap();

        let err = store.append(&reading(1, 0.02)).await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
