//! Pixmill Services Layer
//!
//! This crate is the caller side of the image pipeline: it fetches source bytes
//! from the blob store, runs pipelines off the async runtime with a timeout, and
//! persists the encoded output together with its metadata record. It re-exports
//! the processing and storage API so binaries depend on a single facade.

pub mod error;
pub mod image_service;

pub use error::{ServiceError, ServiceResult};
pub use image_service::ImageService;
pub use pixmill_processing::{
    EncodedImage, ImageInfo, ImageTransformer, Operation, OutputFormat, OutputSpec, Pipeline,
};
pub use pixmill_storage::{
    create_storage, BlobStore, InMemoryStorage, LocalStorage, StorageBackend, StorageError,
    StorageResult,
};
