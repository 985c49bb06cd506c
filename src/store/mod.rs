//! Durable, append-only persistence of readings.
//!
//! The session is the only writer. Nothing is read back in-process;
//! [`MemoryStoreHandle`] exposes written rows for inspection.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, MemoryStoreHandle};
pub use sqlite::SqliteStore;

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{StorageBackend, StorageSettings};
use crate::data::Reading;
use crate::error::StoreError;

/// Table that holds one row per persisted reading.
pub const READINGS_TABLE: &str = "asbestos_readings";

/// A persisted row. Carries no sequence index; the backend assigns its own
/// identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRow {
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub concentration: f64,
    pub risk_level: String,
}

impl From<&Reading> for StoredRow {
    fn from(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp(),
            location: reading.location().to_string(),
            concentration: reading.concentration(),
            risk_level: reading.risk_tier().label().to_string(),
        }
    }
}

/// Append-only sink for readings.
#[async_trait]
pub trait PersistenceStore: Send + Debug {
    /// Durably record one reading.
    async fn append(&mut self, reading: &Reading) -> Result<(), StoreError>;

    /// Flush and release the store. Appends after this fail with
    /// [`StoreError::Closed`].
    async fn close(&mut self) -> Result<(), StoreError>;

    /// Returns a human-readable description of the backend.
    fn description(&self) -> &str;
}

/// Open the store selected by the storage settings.
pub async fn open(settings: &StorageSettings) -> Result<Box<dyn PersistenceStore>, StoreError> {
    match settings.backend {
        StorageBackend::Sqlite => Ok(Box::new(SqliteStore::open(&settings.database).await?)),
        StorageBackend::Memory => Ok(Box::new(MemoryStore::new())),
    }
}
