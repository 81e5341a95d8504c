//! File status records
//!
//! [`MetadataStore`] reads and writes [`FileRecord`]s by `fileId` and looks
//! them up through the `jobId` secondary index. Writes are partial,
//! conditional-free overwrites of the named attributes, so repeating a write
//! leaves the record unchanged.

use async_trait::async_trait;
use doctrans_common::{FileRecord, FileStatus};
use thiserror::Error;

pub mod dynamodb;

pub use dynamodb::DynamoMetadataStore;

/// Metadata store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("Job {job_id} is referenced by {count} file records")]
    AmbiguousJobId { job_id: String, count: usize },

    #[error("Malformed file record: {0}")]
    Malformed(String),
}

/// Partial update of a file record.
///
/// `status` is always written; the optional fields are written only when
/// present and otherwise keep their stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: FileStatus,
    pub job_id: Option<String>,
    pub file_name: Option<String>,
    pub language_code: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: FileStatus) -> Self {
        Self {
            status,
            job_id: None,
            file_name: None,
            language_code: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }
}

/// Access to file status records
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Upsert `update` onto the record keyed by `file_id`.
    async fn update_status(&self, file_id: &str, update: StatusUpdate) -> Result<(), StoreError>;

    /// The record carrying `job_id`, if any.
    ///
    /// More than one match is reported as [`StoreError::AmbiguousJobId`].
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<FileRecord>, StoreError>;

    /// The record keyed by `file_id`, if any.
    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError>;
}

/// Reduce the result of a job-id lookup to zero or one record.
pub fn single_match(
    job_id: &str,
    mut records: Vec<FileRecord>,
) -> Result<Option<FileRecord>, StoreError> {
    match records.len() {
        0 => Ok(None),
        1 => Ok(records.pop()),
        count => Err(StoreError::AmbiguousJobId {
            job_id: job_id.to_string(),
            count,
        }),
    }
}
