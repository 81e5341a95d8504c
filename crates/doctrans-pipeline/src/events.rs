//! Inbound event shapes
//!
//! Object-created notifications use `aws_lambda_events`. The translation job
//! state-change event and the upload API request are typed here since only a
//! few of their fields matter.

use aws_lambda_events::event::s3::S3Event;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use doctrans_common::FileStatus;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::storage::S3Location;

// ============================================================================
// Object created
// ============================================================================

/// Decode an object key from an S3 notification.
///
/// Keys arrive form-encoded: spaces as `+`, everything else percent-encoded.
pub fn decode_object_key(key: &str) -> PipelineResult<String> {
    let spaced = key.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| PipelineError::InvalidEvent(format!("undecodable object key {}: {}", key, e)))
}

/// Uploaded objects named by an S3 notification, in record order.
pub fn uploaded_objects(event: &S3Event) -> Vec<PipelineResult<S3Location>> {
    event
        .records
        .iter()
        .map(|record| {
            let bucket = record
                .s3
                .bucket
                .name
                .as_deref()
                .filter(|name| !name.is_empty())
                .ok_or_else(|| PipelineError::InvalidEvent("record has no bucket name".into()))?;
            let key = record
                .s3
                .object
                .key
                .as_deref()
                .filter(|key| !key.is_empty())
                .ok_or_else(|| PipelineError::InvalidEvent("record has no object key".into()))?;

            Ok(S3Location::new(bucket, decode_object_key(key)?))
        })
        .collect()
}

// ============================================================================
// Translation job state change
// ============================================================================

/// Status reported by a job state-change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    InProgress,
    Completed,
    CompletedWithError,
    Failed,
    StopRequested,
    Stopped,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::CompletedWithError => "COMPLETED_WITH_ERROR",
            JobStatus::Failed => "FAILED",
            JobStatus::StopRequested => "STOP_REQUESTED",
            JobStatus::Stopped => "STOPPED",
            JobStatus::Unknown => "UNKNOWN",
        }
    }

    /// File status this job status settles on, if it is terminal.
    ///
    /// Only a clean completion counts as success.
    pub fn outcome(&self) -> Option<FileStatus> {
        match self {
            JobStatus::Completed => Some(FileStatus::Completed),
            JobStatus::Failed | JobStatus::CompletedWithError | JobStatus::Stopped => {
                Some(FileStatus::Failed)
            },
            JobStatus::Submitted
            | JobStatus::InProgress
            | JobStatus::StopRequested
            | JobStatus::Unknown => None,
        }
    }
}

/// `detail` of a job state-change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStateDetail {
    pub job_id: String,
    pub job_status: JobStatus,
}

/// EventBridge "Translate TextTranslationJob State Change" event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStateChangeEvent {
    /// Account that owns the job; part of the engine's output path
    pub account: String,
    #[serde(rename = "detail-type", default, skip_serializing_if = "Option::is_none")]
    pub detail_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub detail: JobStateDetail,
}

impl JobStateChangeEvent {
    pub fn from_value(value: serde_json::Value) -> PipelineResult<Self> {
        let event: Self = serde_json::from_value(value)
            .map_err(|e| PipelineError::InvalidEvent(format!("job state event: {}", e)))?;

        if event.account.trim().is_empty() {
            return Err(PipelineError::InvalidEvent("job state event has no account".into()));
        }
        if event.detail.job_id.trim().is_empty() {
            return Err(PipelineError::InvalidEvent("job state event has no jobId".into()));
        }

        Ok(event)
    }
}

// ============================================================================
// Upload API
// ============================================================================

/// API Gateway proxy request, reduced to the fields the handler reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRequest {
    #[serde(default)]
    pub http_method: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl ApiRequest {
    pub fn is_preflight(&self) -> bool {
        self.http_method
            .as_deref()
            .is_some_and(|method| method.eq_ignore_ascii_case("OPTIONS"))
    }

    /// Request body as text, decoding base64 when flagged.
    pub fn body_text(&self) -> PipelineResult<String> {
        let body = self
            .body
            .as_deref()
            .filter(|body| !body.trim().is_empty())
            .ok_or_else(|| PipelineError::InvalidRequest("request body is empty".into()))?;

        if !self.is_base64_encoded {
            return Ok(body.to_string());
        }

        let bytes = STANDARD
            .decode(body)
            .map_err(|e| PipelineError::InvalidRequest(format!("body is not valid base64: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|_| PipelineError::InvalidRequest("body is not valid UTF-8".into()))
    }
}

/// Body of an upload-URL request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub file_type: String,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl UploadUrlRequest {
    pub fn from_api_request(request: &ApiRequest) -> PipelineResult<Self> {
        let body = request.body_text()?;
        serde_json::from_str(&body)
            .map_err(|e| PipelineError::InvalidRequest(format!("malformed request body: {}", e)))
    }
}
