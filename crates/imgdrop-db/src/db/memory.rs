use async_trait::async_trait;
use imgdrop_core::{ImageRecord, NewImageRecord, PersistenceError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::ImageStore;

/// Process-local [`ImageStore`] keyed by filename.
#[derive(Clone, Default)]
pub struct InMemoryImageStore {
    records: Arc<Mutex<HashMap<String, ImageRecord>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, ordered by id.
    pub async fn all(&self) -> Vec<ImageRecord> {
        let mut records: Vec<ImageRecord> = self.records.lock().await.values().cloned().collect();
        records.sort_by_key(|r| r.id);
        records
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn insert(&self, record: NewImageRecord) -> Result<ImageRecord, PersistenceError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.filename) {
            return Err(PersistenceError::DuplicateFilename(record.filename));
        }
        let id = records.len() as i64 + 1;
        let stored = record.into_record(id);
        records.insert(stored.filename.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<ImageRecord>, PersistenceError> {
        Ok(self.records.lock().await.get(filename).cloned())
    }

    async fn count(&self) -> Result<i64, PersistenceError> {
        Ok(self.records.lock().await.len() as i64)
    }
}
