//! Error types module
//!
//! `AppError` is the error type of the core crate and of metadata store backends.
//! Processing and storage crates define their own error enums; the service layer
//! aggregates them.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Machine-readable error code (e.g. "NOT_FOUND")
    pub fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    /// Whether the failed call may succeed if retried
    pub fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    pub fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).2
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, LogLevel) {
    match err {
        AppError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Debug),
        AppError::Conflict(_) => ("CONFLICT", false, LogLevel::Debug),
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        AppError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        AppError::ImageProcessing(_) => ("IMAGE_PROCESSING_ERROR", false, LogLevel::Warn),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            ("INTERNAL_ERROR", true, LogLevel::Error)
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::NotFound("x".into()).error_code(), "NOT_FOUND");
        assert_eq!(AppError::Conflict("x".into()).error_code(), "CONFLICT");
        assert_eq!(AppError::Storage("x".into()).error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_recoverable_and_log_level() {
        assert!(AppError::Storage("disk".into()).is_recoverable());
        assert!(!AppError::InvalidInput("bad".into()).is_recoverable());
        assert_eq!(AppError::Internal("boom".into()).log_level(), LogLevel::Error);
        assert_eq!(AppError::NotFound("img".into()).log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_from_conversions() {
        let err: AppError = io::Error::new(io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(err, AppError::Internal(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AppError = json_err.into();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err: AppError = anyhow::anyhow!("wrapped").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
