//! Error types for the image pipeline

use crate::operation::OperationKind;
use thiserror::Error;

/// Failure of a single codec or pixel operation
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt image data: {0}")]
    CorruptData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),
}

/// Discriminant of [`ProcessingError`], for matching without the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedFormat,
    CorruptData,
    InvalidParameter,
    OutOfBounds,
    FontNotFound,
    EncodeFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            ErrorKind::CorruptData => "CORRUPT_DATA",
            ErrorKind::InvalidParameter => "INVALID_PARAMETER",
            ErrorKind::OutOfBounds => "OUT_OF_BOUNDS",
            ErrorKind::FontNotFound => "FONT_NOT_FOUND",
            ErrorKind::EncodeFailed => "ENCODE_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProcessingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            ProcessingError::CorruptData(_) => ErrorKind::CorruptData,
            ProcessingError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ProcessingError::OutOfBounds(_) => ErrorKind::OutOfBounds,
            ProcessingError::FontNotFound(_) => ErrorKind::FontNotFound,
            ProcessingError::EncodeFailed(_) => ErrorKind::EncodeFailed,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ProcessingError::InvalidParameter(msg.into())
    }
}

pub type ProcessingResult<T> = Result<T, ProcessingError>;

/// Failure of a pipeline run, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An operation could not be built from its description
    #[error("Invalid operation: {0}")]
    InvalidOperation(#[source] ProcessingError),

    #[error("Failed to decode input: {0}")]
    Decode(#[source] ProcessingError),

    #[error("Operation {index} ({kind}) failed: {source}")]
    Operation {
        index: usize,
        kind: OperationKind,
        #[source]
        source: ProcessingError,
    },

    #[error("Failed to encode output: {0}")]
    Encode(#[source] ProcessingError),
}

impl PipelineError {
    /// Kind of the underlying processing error
    pub fn kind(&self) -> ErrorKind {
        self.processing_error().kind()
    }

    pub fn processing_error(&self) -> &ProcessingError {
        match self {
            PipelineError::InvalidOperation(e)
            | PipelineError::Decode(e)
            | PipelineError::Encode(e) => e,
            PipelineError::Operation { source, .. } => source,
        }
    }

    /// Index of the failing operation, when an operation failed
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            PipelineError::Operation { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Caller errors (bad input or parameters) as opposed to encoder failures
    pub fn is_client_error(&self) -> bool {
        !matches!(self.kind(), ErrorKind::EncodeFailed)
    }
}
