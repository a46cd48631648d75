//! Service error type aggregating storage, metadata and pipeline failures

use pixmill_core::AppError;
use pixmill_processing::{PipelineError, ProcessingError};
use pixmill_storage::StorageError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Metadata(#[from] AppError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Image processing timed out after {0:?}")]
    Timeout(Duration),

    #[error("Image processing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Machine-readable error code (e.g. "NOT_FOUND")
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Storage(StorageError::NotFound(_)) => "NOT_FOUND",
            ServiceError::Storage(StorageError::InvalidKey(_)) => "INVALID_INPUT",
            ServiceError::Storage(_) => "STORAGE_ERROR",
            ServiceError::Metadata(e) => e.error_code(),
            ServiceError::Pipeline(e) => e.kind().as_str(),
            ServiceError::Processing(e) => e.kind().as_str(),
            ServiceError::Timeout(_) => "TIMEOUT",
            ServiceError::Join(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller sent something the pipeline or stores refused
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Storage(StorageError::NotFound(_) | StorageError::InvalidKey(_)) => true,
            ServiceError::Storage(_) => false,
            ServiceError::Metadata(e) => !e.is_recoverable(),
            ServiceError::Pipeline(e) => e.is_client_error(),
            ServiceError::Processing(e) => e.kind() != pixmill_processing::ErrorKind::EncodeFailed,
            ServiceError::Timeout(_) | ServiceError::Join(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmill_processing::OperationKind;

    #[test]
    fn test_error_codes() {
        let err: ServiceError = StorageError::NotFound("images/a.png".to_string()).into();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(err.is_client_error());

        let err: ServiceError = AppError::Conflict("a.png".to_string()).into();
        assert_eq!(err.error_code(), "CONFLICT");
        assert!(err.is_client_error());

        let err = ServiceError::Timeout(Duration::from_secs(30));
        assert_eq!(err.error_code(), "TIMEOUT");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_pipeline_error_keeps_message() {
        let err: ServiceError = PipelineError::Operation {
            index: 0,
            kind: OperationKind::Crop,
            source: ProcessingError::OutOfBounds("crop box".to_string()),
        }
        .into();
        assert_eq!(err.error_code(), "OUT_OF_BOUNDS");
        assert_eq!(err.to_string(), "Operation 0 (crop) failed: Out of bounds: crop box");
    }
}
