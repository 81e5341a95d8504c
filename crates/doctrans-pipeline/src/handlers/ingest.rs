//! Object-created handler
//!
//! Dispatches on the uploaded file's extension:
//!
//! - `.txt` is translated inline and delivered immediately.
//! - `.docx` is staged as-is and submitted as an asynchronous job.
//! - `.pdf` is converted to `.docx`, staged, then submitted.
//!
//! Anything else is rejected before any I/O.

use aws_lambda_events::event::s3::S3Event;
use doctrans_common::{types::converted_file_name, DocumentFormat, FileStatus};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, field, info, instrument, warn, Span};

use super::{mark_failed, notify, record_status, HandlerResponse};
use crate::context::PipelineContext;
use crate::convert::ConvertError;
use crate::error::{PipelineError, PipelineResult};
use crate::events::uploaded_objects;
use crate::metadata::StatusUpdate;
use crate::notify::templates;
use crate::storage::S3Location;

/// Object metadata naming the requested target language.
pub const LANGUAGE_CODE_METADATA: &str = "languagecode";

/// Object metadata naming the file record.
pub const FILE_ID_METADATA: &str = "fileid";

/// What ingestion did with an uploaded object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestAction {
    /// Text translated inline and delivered
    Translated,
    /// Document staged and submitted as a job
    Submitted,
    /// Record already has a job or a terminal status; nothing done
    Duplicate,
}

/// Result of ingesting one uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub bucket: String,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub format: DocumentFormat,
    pub target_language: String,
    pub action: IngestAction,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

struct Upload {
    location: S3Location,
    file_name: String,
    format: DocumentFormat,
    target_language: String,
    file_id: Option<String>,
    /// Names the staging directory and the job; the file id when known
    staging_id: String,
}

impl Upload {
    fn outcome(&self, action: IngestAction, status: FileStatus) -> IngestOutcome {
        IngestOutcome {
            bucket: self.location.bucket.clone(),
            key: self.location.key.clone(),
            file_id: self.file_id.clone(),
            format: self.format,
            target_language: self.target_language.clone(),
            action,
            status,
            job_id: None,
            output_key: None,
        }
    }

    /// FAILED write that also carries what is known about the upload
    fn failure_update(&self) -> StatusUpdate {
        StatusUpdate::new(FileStatus::Failed)
            .with_file_name(&self.file_name)
            .with_language_code(&self.target_language)
    }
}

/// Entry point for S3 object-created notifications.
///
/// Records are processed in order; a failing record does not stop the
/// others. The response reports the first failure, if any.
pub async fn handle_object_created(ctx: &PipelineContext, event: S3Event) -> HandlerResponse {
    let objects = uploaded_objects(&event);
    if objects.is_empty() {
        let err = PipelineError::InvalidEvent("event carries no records".to_string());
        warn!(error = %err, "Ignoring empty notification");
        return HandlerResponse::error(&err);
    }

    let mut processed = Vec::new();
    let mut first_error = None;

    for object in objects {
        let result = match object {
            Ok(location) => ingest_object(ctx, &location).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => processed.push(outcome),
            Err(e) => {
                error!(code = e.code(), error = %e, "Ingestion failed");
                first_error.get_or_insert(e);
            },
        }
    }

    match first_error {
        Some(err) => HandlerResponse::error(&err),
        None => HandlerResponse::success(&json!({ "processed": processed })),
    }
}

/// Ingest one uploaded object.
///
/// A record that already carries a job id or a terminal status is left
/// alone, so redelivered notifications never reopen it. On failure after
/// the file id is known, the record is marked FAILED before the error is
/// returned.
#[instrument(skip(ctx, location), fields(bucket = %location.bucket, key = %location.key, file_id = field::Empty))]
pub async fn ingest_object(
    ctx: &PipelineContext,
    location: &S3Location,
) -> PipelineResult<IngestOutcome> {
    let format = DocumentFormat::from_file_name(&location.key)?;

    let metadata = ctx
        .objects
        .metadata(location)
        .await
        .map_err(PipelineError::object_store)?;

    let file_id = metadata_value(&metadata, FILE_ID_METADATA);
    let target_language = metadata_value(&metadata, LANGUAGE_CODE_METADATA)
        .unwrap_or_else(|| ctx.config.translation.default_target_language.clone());

    match &file_id {
        Some(id) => {
            Span::current().record("file_id", id.as_str());
        },
        None => warn!("Upload carries no fileid metadata; status will not be tracked"),
    }

    let upload = Upload {
        location: location.clone(),
        file_name: location.file_name().to_string(),
        format,
        target_language,
        staging_id: file_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        file_id,
    };

    if let Some(file_id) = &upload.file_id {
        if let Some(existing) = ctx.store.get(file_id).await? {
            if existing.status.is_terminal() || existing.job_id.is_some() {
                info!(
                    status = %existing.status,
                    job_id = ?existing.job_id,
                    "Upload already processed; ignoring redelivered notification"
                );
                return Ok(IngestOutcome {
                    job_id: existing.job_id,
                    ..upload.outcome(IngestAction::Duplicate, existing.status)
                });
            }
        }
    }

    info!(%format, target_language = %upload.target_language, "Processing upload");

    let result = match format {
        DocumentFormat::PlainText => translate_plain_text(ctx, &upload).await,
        DocumentFormat::Docx | DocumentFormat::Pdf => submit_document(ctx, &upload).await,
    };

    if let Err(e) = &result {
        mark_failed(ctx, upload.file_id.as_deref(), upload.failure_update(), e).await;
    }

    result
}

fn metadata_value(metadata: &HashMap<String, String>, name: &str) -> Option<String> {
    metadata
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Synchronous path: translate, store, link, notify. No job id.
async fn translate_plain_text(
    ctx: &PipelineContext,
    upload: &Upload,
) -> PipelineResult<IngestOutcome> {
    if let Some(file_id) = &upload.file_id {
        record_status(
            ctx,
            file_id,
            StatusUpdate::new(FileStatus::InProgress)
                .with_file_name(&upload.file_name)
                .with_language_code(&upload.target_language),
        )
        .await;
    }

    let bytes = ctx
        .objects
        .get(&upload.location)
        .await
        .map_err(PipelineError::object_store)?;
    let text = String::from_utf8(bytes).map_err(|_| ConvertError::NotUtf8)?;

    let translated = ctx
        .submitter
        .translate_text(&text, &upload.target_language)
        .await?;

    let output = ctx.config.buckets.text_output_location(&upload.file_name);
    ctx.objects
        .put(&output, translated.into_bytes(), Some("text/plain; charset=utf-8"))
        .await
        .map_err(PipelineError::object_store)?;

    let ttl = ctx.config.links.download_ttl();
    let url = ctx
        .objects
        .presigned_get_url(&output, ttl)
        .await
        .map_err(PipelineError::object_store)?;

    if let Some(file_id) = &upload.file_id {
        record_status(ctx, file_id, StatusUpdate::new(FileStatus::Completed)).await;
    }

    let reference = upload.file_id.as_deref().unwrap_or(&upload.file_name);
    notify(
        ctx,
        &templates::translation_ready(ctx.recipient(), reference, &upload.file_name, &url, ttl),
    )
    .await;

    info!(output = %output, "Text document translated");

    Ok(IngestOutcome {
        output_key: Some(output.key),
        ..upload.outcome(IngestAction::Translated, FileStatus::Completed)
    })
}

/// Asynchronous path: stage, submit, record the job id.
async fn submit_document(ctx: &PipelineContext, upload: &Upload) -> PipelineResult<IngestOutcome> {
    let buckets = &ctx.config.buckets;

    let staged_format = match upload.format {
        DocumentFormat::Pdf => {
            let bytes = ctx
                .objects
                .get(&upload.location)
                .await
                .map_err(PipelineError::object_store)?;

            let converter = Arc::clone(&ctx.converter);
            let document = tokio::task::spawn_blocking(move || {
                converter.to_translatable(bytes, DocumentFormat::Pdf)
            })
            .await
            .map_err(|e| ConvertError::PdfParse(format!("conversion aborted: {}", e)))??;

            let staged = buckets.staging_location(
                &upload.staging_id,
                &converted_file_name(&upload.file_name),
            );
            ctx.objects
                .put(&staged, document.bytes, Some(document.format.mime_type()))
                .await
                .map_err(PipelineError::object_store)?;

            debug!(staged = %staged, "Staged converted document");
            document.format
        },
        format => {
            let staged = buckets.staging_location(&upload.staging_id, &upload.file_name);
            ctx.objects
                .copy(&upload.location, &staged)
                .await
                .map_err(PipelineError::object_store)?;

            debug!(staged = %staged, "Staged document");
            format
        },
    };

    let job_id = ctx
        .submitter
        .submit(
            &upload.staging_id,
            &buckets.staging_dir(&upload.staging_id),
            &buckets.output_dir(),
            &upload.target_language,
            staged_format,
        )
        .await?;

    if let Some(file_id) = &upload.file_id {
        ctx.store
            .update_status(
                file_id,
                StatusUpdate::new(FileStatus::InProgress)
                    .with_job_id(&job_id)
                    .with_file_name(&upload.file_name)
                    .with_language_code(&upload.target_language),
            )
            .await?;
    }

    Ok(IngestOutcome {
        job_id: Some(job_id),
        ..upload.outcome(IngestAction::Submitted, FileStatus::InProgress)
    })
}
