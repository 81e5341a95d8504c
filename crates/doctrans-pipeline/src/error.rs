//! Pipeline error types

use thiserror::Error;

use crate::convert::ConvertError;
use crate::metadata::StoreError;

/// Result type alias for handler operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Failures a handler can report
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document conversion failed: {0}")]
    ConversionFailure(#[from] ConvertError),

    #[error("Translation job submission failed: {0}")]
    SubmissionFailure(String),

    #[error("Translation failed: {0}")]
    TranslationFailure(String),

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("No file record for job {0}")]
    RecordNotFound(String),

    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification failed: {0}")]
    Notification(String),
}

impl PipelineError {
    /// Wrap an object store failure, keeping its context chain.
    pub fn object_store(err: anyhow::Error) -> Self {
        PipelineError::ObjectStore(format!("{:#}", err))
    }

    /// HTTP-style status reported in the handler result.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::UnsupportedFormat(_)
            | PipelineError::InvalidEvent(_)
            | PipelineError::InvalidRequest(_) => 400,
            PipelineError::RecordNotFound(_) => 404,
            PipelineError::ConversionFailure(_)
            | PipelineError::SubmissionFailure(_)
            | PipelineError::TranslationFailure(_)
            | PipelineError::ObjectStore(_)
            | PipelineError::Store(_)
            | PipelineError::Notification(_) => 500,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            PipelineError::InvalidEvent(_) => "INVALID_EVENT",
            PipelineError::InvalidRequest(_) => "INVALID_REQUEST",
            PipelineError::ConversionFailure(_) => "CONVERSION_FAILURE",
            PipelineError::SubmissionFailure(_) => "SUBMISSION_FAILURE",
            PipelineError::TranslationFailure(_) => "TRANSLATION_FAILURE",
            PipelineError::ObjectStore(_) => "OBJECT_STORE_ERROR",
            PipelineError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            PipelineError::Store(_) => "STORE_ERROR",
            PipelineError::Notification(_) => "NOTIFICATION_FAILURE",
        }
    }
}

impl From<doctrans_common::DocTransError> for PipelineError {
    fn from(err: doctrans_common::DocTransError) -> Self {
        match err {
            doctrans_common::DocTransError::UnsupportedFormat(name) => {
                PipelineError::UnsupportedFormat(name)
            },
            other => PipelineError::InvalidEvent(other.to_string()),
        }
    }
}
