use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

const MAX_NAME_LENGTH: usize = 255;

/// Stored image record. `name` is unique across the store and doubles as the
/// blob key suffix (`images/{name}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn storage_key(&self) -> String {
        format!("images/{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImageRecord {
    pub name: String,
    pub user_id: Uuid,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl NewImageRecord {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        if self.width == 0 || self.height == 0 {
            return Err(AppError::InvalidInput(format!(
                "Image dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRecordUpdate {
    pub name: Option<String>,
    pub user_id: Option<Uuid>,
    pub size_bytes: Option<u64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
}

impl ImageRecordUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(AppError::InvalidInput(
                "Image dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn apply_to(self, record: &mut ImageRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(user_id) = self.user_id {
            record.user_id = user_id;
        }
        if let Some(size_bytes) = self.size_bytes {
            record.size_bytes = size_bytes;
        }
        if let Some(width) = self.width {
            record.width = width;
        }
        if let Some(height) = self.height {
            record.height = height;
        }
        if let Some(format) = self.format {
            record.format = format;
        }
        record.updated_at = Utc::now();
    }
}

/// Names become part of a storage key, so path separators and traversal are rejected.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("Image name must not be empty".to_string()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Image name exceeds {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(AppError::InvalidInput(format!("Invalid image name: {}", name)));
    }
    Ok(())
}
