//! Pixmill Storage Library
//!
//! This crate provides the blob store abstraction used by the service layer to
//! fetch source images and persist encoded output, with local filesystem and
//! in-memory implementations.
//!
//! # Storage key format
//!
//! Image blobs live under `images/{name}`. Keys must not contain `..` or a leading
//! `/`. Key generation and validation are centralized in the `keys` module so all
//! backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::image_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::InMemoryStorage;
pub use pixmill_core::StorageBackend;
pub use traits::{BlobStore, StorageError, StorageResult};
