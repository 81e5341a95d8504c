//! Lambda entry points
//!
//! Handlers never return an error to the runtime. Every failure is logged
//! and turned into a [`HandlerResponse`]; redelivery is left to the trigger.

use doctrans_common::FileStatus;
use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::metadata::StatusUpdate;
use crate::notify::Notification;

pub mod completion;
pub mod ingest;
pub mod response;
pub mod upload_url;

pub use completion::handle_job_state_change;
pub use ingest::handle_object_created;
pub use response::HandlerResponse;
pub use upload_url::handle_upload_url_request;

/// Write `failure` (a FAILED update) for `file_id`, if known. Never fails.
///
/// A record that has already settled as COMPLETED is left untouched.
pub(crate) async fn mark_failed(
    ctx: &PipelineContext,
    file_id: Option<&str>,
    failure: StatusUpdate,
    cause: &PipelineError,
) {
    let Some(file_id) = file_id else {
        warn!(error = %cause, "No file id known; failure not recorded");
        return;
    };

    match ctx.store.get(file_id).await {
        Ok(Some(record)) if !record.status.can_transition_to(FileStatus::Failed) => {
            warn!(file_id, current = %record.status, error = %cause, "File already settled; failure not recorded");
            return;
        },
        Ok(_) => {},
        Err(e) => {
            error!(file_id, error = %e, cause = %cause, "Could not read file before marking FAILED");
            return;
        },
    }

    match ctx.store.update_status(file_id, failure).await {
        Ok(()) => info!(file_id, error = %cause, "Marked file as FAILED"),
        Err(e) => error!(file_id, error = %e, cause = %cause, "Failed to mark file as FAILED"),
    }
}

/// Status write whose failure is logged and otherwise ignored.
pub(crate) async fn record_status(ctx: &PipelineContext, file_id: &str, update: StatusUpdate) {
    let status = update.status;
    if let Err(e) = ctx.store.update_status(file_id, update).await {
        error!(file_id, %status, error = %e, "Status write failed; continuing");
    }
}

/// Send `notification`, logging delivery failures. Returns whether it was sent.
pub(crate) async fn notify(ctx: &PipelineContext, notification: &Notification) -> bool {
    match ctx.notifier.send(notification).await {
        Ok(()) => true,
        Err(e) => {
            let err = PipelineError::Notification(format!("{:#}", e));
            error!(subject = %notification.subject, error = %err, "Notification not delivered");
            false
        },
    }
}
