//! Shared key generation and validation for storage backends.
//!
//! Key format: `images/{name}`.

use crate::traits::{StorageError, StorageResult};

const IMAGE_PREFIX: &str = "images";

/// Storage key for a named image. All backends must use this format for consistency.
pub fn image_key(name: &str) -> String {
    format!("{}/{}", IMAGE_PREFIX, name)
}

/// Reject keys that are empty, absolute or contain traversal sequences.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}
