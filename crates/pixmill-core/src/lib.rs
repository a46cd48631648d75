//! Pixmill Core Library
//!
//! This crate provides the configuration, error types, image record model and
//! metadata store abstraction shared across all Pixmill components.

pub mod config;
pub mod error;
pub mod metadata_store;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, ProcessorConfig, StorageConfig};
pub use error::{AppError, AppResult, LogLevel};
pub use metadata_store::{InMemoryMetadataStore, MetadataStore};
pub use models::{ImageRecord, ImageRecordUpdate, NewImageRecord};
pub use storage_types::StorageBackend;
