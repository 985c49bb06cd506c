//! In-process store.
//!
//! Keeps rows in memory behind a shared handle so callers can inspect what
//! was written after the store has been moved into a session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{PersistenceStore, StoredRow};
use crate::data::Reading;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<StoredRow>,
    close_calls: usize,
}

/// A store that keeps rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared read-only handle onto the stored rows.
    pub fn handle(&self) -> MemoryStoreHandle {
        MemoryStoreHandle {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn append(&mut self, reading: &Reading) -> Result<(), StoreError> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        lock(&self.inner).rows.push(StoredRow::from(reading));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        lock(&self.inner).close_calls += 1;
        Ok(())
    }

    fn description(&self) -> &str {
        "memory"
    }
}

/// Inspection handle returned by [`MemoryStore::handle`].
#[derive(Debug, Clone)]
pub struct MemoryStoreHandle {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStoreHandle {
    pub fn rows(&self) -> Vec<StoredRow> {
        lock(&self.inner).rows.clone()
    }

    pub fn row_count(&self) -> usize {
        lock(&self.inner).rows.len()
    }

    /// How many times `close()` has been called.
    pub fn close_calls(&self) -> usize {
        lock(&self.inner).close_calls
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_append_and_inspect() {
        let mut store = MemoryStore::new();
        let handle = store.handle();

        store.append(&Reading::new(1, Utc::now(), "Attic", 0.02)).await.unwrap();
        store.append(&Reading::new(2, Utc::now(), "Attic", 0.3)).await.unwrap();

        let rows = handle.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].risk_level, "Medium");
        assert_eq!(rows[1].risk_level, "High");
        assert_eq!(rows[1].location, "Attic");
    }

    #[tokio::test]
    async fn test_append_after_close_fails() {
        let mut store = MemoryStore::new();
        let handle = store.handle();
        store.close().await.unwrap();

        let err = store.append(&Reading::new(1, Utc::now(), "Attic", 0.02)).await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
        assert_eq!(handle.close_calls(), 1);
        assert_eq!(handle.row_count(), 0);
    }
}
