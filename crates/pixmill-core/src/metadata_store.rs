//! Metadata store abstraction
//!
//! Image records are addressed by their unique name. Backends must reject a
//! create or rename that would produce a duplicate name with `AppError::Conflict`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ImageRecord, ImageRecordUpdate, NewImageRecord};

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create(&self, record: NewImageRecord) -> AppResult<ImageRecord>;

    async fn update(&self, name: &str, update: ImageRecordUpdate) -> AppResult<ImageRecord>;

    async fn delete(&self, name: &str) -> AppResult<()>;

    async fn get_by_name(&self, name: &str) -> AppResult<Option<ImageRecord>>;

    /// List records ordered by name
    async fn list(&self, limit: usize, offset: usize) -> AppResult<Vec<ImageRecord>>;
}

/// Process-local metadata store
#[derive(Default)]
pub struct InMemoryMetadataStore {
    records: RwLock<BTreeMap<String, ImageRecord>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn create(&self, record: NewImageRecord) -> AppResult<ImageRecord> {
        record.validate()?;

        let mut records = self.records.write().await;
        if records.contains_key(&record.name) {
            return Err(AppError::Conflict(format!(
                "Image name already exists: {}",
                record.name
            )));
        }

        let now = Utc::now();
        let stored = ImageRecord {
            id: Uuid::new_v4(),
            name: record.name,
            user_id: record.user_id,
            size_bytes: record.size_bytes,
            width: record.width,
            height: record.height,
            format: record.format,
            created_at: now,
            updated_at: now,
        };
        records.insert(stored.name.clone(), stored.clone());

        tracing::debug!(name = %stored.name, id = %stored.id, "Image record created");
        Ok(stored)
    }

    async fn update(&self, name: &str, update: ImageRecordUpdate) -> AppResult<ImageRecord> {
        update.validate()?;

        let mut records = self.records.write().await;
        if let Some(new_name) = update.name.as_deref() {
            if new_name != name && records.contains_key(new_name) {
                return Err(AppError::Conflict(format!(
                    "Image name already exists: {}",
                    new_name
                )));
            }
        }

        let mut record = records
            .remove(name)
            .ok_or_else(|| AppError::NotFound(format!("Image not found: {}", name)))?;
        update.apply_to(&mut record);
        records.insert(record.name.clone(), record.clone());

        tracing::debug!(name = %record.name, id = %record.id, "Image record updated");
        Ok(record)
    }

    async fn delete(&self, name: &str) -> AppResult<()> {
        let mut records = self.records.write().await;
        records
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Image not found: {}", name)))
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<ImageRecord>> {
        Ok(self.records.read().await.get(name).cloned())
    }

    async fn list(&self, limit: usize, offset: usize) -> AppResult<Vec<ImageRecord>> {
        let records = self.records.read().await;
        Ok(records.values().skip(offset).take(limit).cloned().collect())
    }
}
