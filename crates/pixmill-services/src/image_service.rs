//! Image service
//!
//! Couples the blob store, the metadata store and the image pipeline. Blobs live
//! under `images/{name}` and every blob has exactly one record with the same name.

use crate::error::{ServiceError, ServiceResult};
use bytes::Bytes;
use pixmill_core::models::validate_name;
use pixmill_core::{
    AppError, ImageRecord, ImageRecordUpdate, MetadataStore, NewImageRecord, ProcessorConfig,
};
use pixmill_processing::{EncodedImage, ImageInfo, ImageTransformer, OutputFormat, OutputSpec, Pipeline};
use pixmill_storage::{image_key, BlobStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Clone)]
pub struct ImageService {
    storage: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    transformer: ImageTransformer,
    timeout: Duration,
}

impl ImageService {
    pub fn new(
        storage: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        config: ProcessorConfig,
    ) -> Self {
        let timeout = config.processing_timeout;
        Self {
            storage,
            metadata,
            transformer: ImageTransformer::new(config),
            timeout,
        }
    }

    pub fn transformer(&self) -> &ImageTransformer {
        &self.transformer
    }

    /// Store a new image under a unique name.
    ///
    /// The record is created first and reserves the name, so a concurrent store
    /// of the same name fails with a conflict before touching the blob. If the
    /// blob write fails the record is removed again.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn store(&self, name: &str, user_id: Uuid, data: Bytes) -> ServiceResult<ImageRecord> {
        validate_name(name)?;
        if self.metadata.get_by_name(name).await?.is_some() {
            return Err(AppError::Conflict(format!("Image name already exists: {}", name)).into());
        }

        let info = self.probe(&data)?;
        let (width, height) = info.display_dimensions();
        let record = self
            .metadata
            .create(NewImageRecord {
                name: name.to_string(),
                user_id,
                size_bytes: info.size_bytes,
                width,
                height,
                format: info.format.to_string(),
            })
            .await?;
        self.put_or_release(&record, data, &info.mime_type).await?;

        tracing::info!(
            name = %record.name,
            id = %record.id,
            width = record.width,
            height = record.height,
            format = %record.format,
            "Image stored"
        );
        Ok(record)
    }

    /// Run `pipeline` on a stored image without persisting the result
    pub async fn render(
        &self,
        name: &str,
        pipeline: Pipeline,
        output: OutputSpec,
    ) -> ServiceResult<EncodedImage> {
        pipeline.validate()?;
        let source = self.get(name).await?;
        self.render_record(&source, pipeline, output).await
    }

    /// Run `pipeline` on a stored image and persist the output.
    ///
    /// Without `target_name` the source image is replaced in place. An existing
    /// target record is updated; a missing one is created with the source owner.
    #[tracing::instrument(skip(self, pipeline), fields(operations = pipeline.len()))]
    pub async fn transform(
        &self,
        name: &str,
        pipeline: Pipeline,
        output: OutputSpec,
        target_name: Option<&str>,
    ) -> ServiceResult<ImageRecord> {
        pipeline.validate()?;
        let target = target_name.unwrap_or(name);
        validate_name(target)?;

        let source = self.get(name).await?;
        let encoded = self.render_record(&source, pipeline, output).await?;

        let existing = if target == source.name {
            Some(source.clone())
        } else {
            self.metadata.get_by_name(target).await?
        };

        let size_bytes = encoded.len() as u64;
        let record = match existing {
            Some(_) => {
                self.storage
                    .put(&image_key(target), encoded.bytes.clone(), encoded.mime_type())
                    .await?;
                let update = ImageRecordUpdate {
                    size_bytes: Some(size_bytes),
                    width: Some(encoded.width),
                    height: Some(encoded.height),
                    format: Some(encoded.format.to_string()),
                    ..Default::default()
                };
                self.metadata.update(target, update).await?
            }
            None => {
                let record = self
                    .metadata
                    .create(NewImageRecord {
                        name: target.to_string(),
                        user_id: source.user_id,
                        size_bytes,
                        width: encoded.width,
                        height: encoded.height,
                        format: encoded.format.to_string(),
                    })
                    .await?;
                self.put_or_release(&record, encoded.bytes.clone(), encoded.mime_type())
                    .await?;
                record
            }
        };

        tracing::info!(
            source = %source.name,
            target = %record.name,
            width = record.width,
            height = record.height,
            format = %record.format,
            size_bytes = record.size_bytes,
            "Image transformed"
        );
        Ok(record)
    }

    pub async fn get(&self, name: &str) -> ServiceResult<ImageRecord> {
        self.metadata
            .get_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image not found: {}", name)).into())
    }

    /// Stored bytes of an image
    pub async fn read(&self, name: &str) -> ServiceResult<Bytes> {
        let record = self.get(name).await?;
        Ok(self.storage.get(&record.storage_key()).await?)
    }

    pub async fn list(&self, limit: usize, offset: usize) -> ServiceResult<Vec<ImageRecord>> {
        Ok(self.metadata.list(limit, offset).await?)
    }

    /// Delete the record, then its blob
    pub async fn delete(&self, name: &str) -> ServiceResult<()> {
        let record = self.get(name).await?;
        self.metadata.delete(name).await?;
        self.storage.delete(&record.storage_key()).await?;

        tracing::info!(name = %name, id = %record.id, "Image deleted");
        Ok(())
    }

    pub fn probe(&self, data: &[u8]) -> ServiceResult<ImageInfo> {
        Ok(self.transformer.probe(data)?)
    }

    async fn render_record(
        &self,
        source: &ImageRecord,
        pipeline: Pipeline,
        output: OutputSpec,
    ) -> ServiceResult<EncodedImage> {
        let data = self.storage.get(&source.storage_key()).await?;
        let hint = OutputFormat::parse(&source.format).ok();
        self.run_pipeline(data, hint, pipeline, output).await
    }

    /// Execute the pipeline on the blocking pool, bounded by the configured timeout
    async fn run_pipeline(
        &self,
        data: Bytes,
        hint: Option<OutputFormat>,
        pipeline: Pipeline,
        output: OutputSpec,
    ) -> ServiceResult<EncodedImage> {
        let transformer = self.transformer.clone();
        let start = Instant::now();
        let task =
            tokio::task::spawn_blocking(move || transformer.execute(&data, hint, &pipeline, output));

        // The blocking task is not cancelled on timeout; it runs to completion
        // and its result is dropped.
        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => {
                let encoded = joined??;
                Ok(encoded)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Image processing timed out"
                );
                Err(ServiceError::Timeout(self.timeout))
            }
        }
    }

    /// Write the blob for a freshly created record, removing the record if the
    /// write fails
    async fn put_or_release(
        &self,
        record: &ImageRecord,
        data: Bytes,
        content_type: &str,
    ) -> ServiceResult<()> {
        let key = record.storage_key();
        if let Err(e) = self.storage.put(&key, data, content_type).await {
            tracing::warn!(key = %key, error = %e, "Blob write failed, removing image record");
            if let Err(cleanup) = self.metadata.delete(&record.name).await {
                tracing::warn!(name = %record.name, error = %cleanup, "Failed to remove image record");
            }
            return Err(e.into());
        }
        Ok(())
    }
}
