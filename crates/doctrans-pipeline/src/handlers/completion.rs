//! Job state-change handler
//!
//! Correlates an engine job back to its file record and settles the record
//! exactly once per terminal status:
//!
//! ```text
//! event ──> find_by_job_id ──> already settled? ──> ack, no write, no email
//!                                    │
//!                                    ├─ COMPLETED ──> link ──> COMPLETED ──> success email
//!                                    └─ FAILED    ──────────> FAILED    ──> failure email
//! ```

use doctrans_common::{FileRecord, FileStatus};
use serde::Serialize;
use tracing::{error, field, info, instrument, warn, Span};

use super::{mark_failed, notify, record_status, HandlerResponse};
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{JobStateChangeEvent, JobStatus};
use crate::metadata::StatusUpdate;
use crate::notify::templates;

/// What the handler did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionAction {
    /// Record settled as COMPLETED
    Completed,
    /// Record settled as FAILED
    Failed,
    /// Record already in the event's terminal status
    Duplicate,
    /// Non-terminal status, or a record already settled the other way
    Ignored,
}

/// Result of handling one job state-change event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub job_id: String,
    pub job_status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    pub action: CompletionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    pub notified: bool,
}

impl CompletionOutcome {
    fn new(event: &JobStateChangeEvent, record: Option<&FileRecord>, action: CompletionAction) -> Self {
        Self {
            job_id: event.detail.job_id.clone(),
            job_status: event.detail.job_status,
            file_id: record.map(|r| r.file_id.clone()),
            action,
            output_key: None,
            notified: false,
        }
    }
}

/// Entry point for translation job state-change events.
pub async fn handle_job_state_change(
    ctx: &PipelineContext,
    payload: serde_json::Value,
) -> HandlerResponse {
    match process_job_state_change(ctx, payload).await {
        Ok(outcome) => HandlerResponse::success(&outcome),
        Err(e) => {
            error!(code = e.code(), error = %e, "Job state change not processed");
            HandlerResponse::error(&e)
        },
    }
}

/// Handle one event.
///
/// Once the record is resolved, any error leaves it marked FAILED.
#[instrument(skip_all, fields(job_id = field::Empty, file_id = field::Empty))]
pub async fn process_job_state_change(
    ctx: &PipelineContext,
    payload: serde_json::Value,
) -> PipelineResult<CompletionOutcome> {
    let event = JobStateChangeEvent::from_value(payload)?;
    let job_id = event.detail.job_id.as_str();
    let job_status = event.detail.job_status;
    Span::current().record("job_id", job_id);

    let Some(settled) = job_status.outcome() else {
        info!(status = job_status.as_str(), "Ignoring non-terminal job status");
        return Ok(CompletionOutcome::new(&event, None, CompletionAction::Ignored));
    };

    let record = ctx
        .store
        .find_by_job_id(job_id)
        .await?
        .ok_or_else(|| PipelineError::RecordNotFound(job_id.to_string()))?;
    Span::current().record("file_id", record.file_id.as_str());

    if record.status == settled {
        info!(status = %settled, "Duplicate job state change; already recorded");
        return Ok(CompletionOutcome::new(&event, Some(&record), CompletionAction::Duplicate));
    }

    if !record.status.can_transition_to(settled) {
        warn!(
            current = %record.status,
            reported = job_status.as_str(),
            "File already settled; ignoring job state change"
        );
        return Ok(CompletionOutcome::new(&event, Some(&record), CompletionAction::Ignored));
    }

    match settled {
        FileStatus::Completed => {
            let result = complete_translation(ctx, &event, &record).await;
            if let Err(e) = &result {
                mark_failed(ctx, Some(&record.file_id), StatusUpdate::new(FileStatus::Failed), e).await;
            }
            result
        },
        _ => Ok(fail_translation(ctx, &event, &record).await),
    }
}

async fn complete_translation(
    ctx: &PipelineContext,
    event: &JobStateChangeEvent,
    record: &FileRecord,
) -> PipelineResult<CompletionOutcome> {
    let output = ctx.config.buckets.job_output_location(
        &event.account,
        &event.detail.job_id,
        &record.language_code,
        &record.translated_file_name(),
    );

    // Link first: a signing failure must still be able to record FAILED.
    let ttl = ctx.config.links.download_ttl();
    let url = ctx
        .objects
        .presigned_get_url(&output, ttl)
        .await
        .map_err(PipelineError::object_store)?;

    record_status(ctx, &record.file_id, StatusUpdate::new(FileStatus::Completed)).await;

    let notified = notify(
        ctx,
        &templates::translation_ready(
            ctx.recipient(),
            &record.file_id,
            &record.file_name,
            &url,
            ttl,
        ),
    )
    .await;

    info!(output = %output, notified, "Translation completed");

    Ok(CompletionOutcome {
        output_key: Some(output.key),
        notified,
        ..CompletionOutcome::new(event, Some(record), CompletionAction::Completed)
    })
}

async fn fail_translation(
    ctx: &PipelineContext,
    event: &JobStateChangeEvent,
    record: &FileRecord,
) -> CompletionOutcome {
    record_status(ctx, &record.file_id, StatusUpdate::new(FileStatus::Failed)).await;

    let reason = format!(
        "Translation job {} ended with status {}.",
        event.detail.job_id,
        event.detail.job_status.as_str()
    );
    let notified = notify(
        ctx,
        &templates::translation_failed(ctx.recipient(), &record.file_name, &reason),
    )
    .await;

    info!(notified, "Translation failed");

    CompletionOutcome {
        notified,
        ..CompletionOutcome::new(event, Some(record), CompletionAction::Failed)
    }
}
