//! Upload-URL handler
//!
//! Issues a file id, records it as PENDING and hands back a presigned PUT
//! whose signed metadata carries the id and target language, so the
//! object-created handler can correlate the upload.

use doctrans_common::{DocumentFormat, FileStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, instrument};

use super::{ingest::FILE_ID_METADATA, ingest::LANGUAGE_CODE_METADATA, mark_failed, HandlerResponse};
use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{ApiRequest, UploadUrlRequest};
use crate::metadata::StatusUpdate;
use crate::storage::UploadSpec;

/// Longest accepted file name, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// What a client needs to upload a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub url: String,
    pub file_id: String,
    pub key: String,
    /// Headers the PUT must carry verbatim
    pub headers: BTreeMap<String, String>,
}

/// Entry point for upload-URL API requests.
pub async fn handle_upload_url_request(ctx: &PipelineContext, request: ApiRequest) -> HandlerResponse {
    if request.is_preflight() {
        return HandlerResponse::success(&serde_json::json!({})).with_cors();
    }

    let response = match issue_upload_url(ctx, &request).await {
        Ok(grant) => HandlerResponse::success(&grant),
        Err(e) => {
            error!(code = e.code(), error = %e, "Upload URL not issued");
            HandlerResponse::error(&e)
        },
    };

    response.with_cors()
}

#[instrument(skip_all)]
pub async fn issue_upload_url(
    ctx: &PipelineContext,
    request: &ApiRequest,
) -> PipelineResult<UploadGrant> {
    let body = UploadUrlRequest::from_api_request(request)?;
    let format = validate_request(&body)?;

    let language_code = match body.language_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => validate_language_code(code)?,
        _ => ctx.config.translation.default_target_language.clone(),
    };

    let file_id = uuid::Uuid::new_v4().to_string();
    let location = ctx.config.buckets.upload_location(&file_id, &body.file_name);

    ctx.store
        .update_status(
            &file_id,
            StatusUpdate::new(FileStatus::Pending)
                .with_file_name(&body.file_name)
                .with_language_code(&language_code),
        )
        .await?;

    let upload = UploadSpec {
        content_type: body.file_type.trim().to_string(),
        metadata: BTreeMap::from([
            (LANGUAGE_CODE_METADATA.to_string(), language_code.clone()),
            (FILE_ID_METADATA.to_string(), file_id.clone()),
        ]),
    };

    let presigned = match ctx
        .objects
        .presigned_put_url(&location, &upload, ctx.config.links.upload_ttl())
        .await
    {
        Ok(presigned) => presigned,
        Err(e) => {
            let err = PipelineError::object_store(e);
            mark_failed(ctx, Some(&file_id), StatusUpdate::new(FileStatus::Failed), &err).await;
            return Err(err);
        },
    };

    info!(
        file_id = %file_id,
        %format,
        language_code = %language_code,
        key = %location.key,
        "Issued upload URL"
    );

    Ok(UploadGrant {
        url: presigned.url,
        file_id,
        key: location.key,
        headers: presigned.headers,
    })
}

/// Check the request and return the document format it names.
pub fn validate_request(request: &UploadUrlRequest) -> PipelineResult<DocumentFormat> {
    let name = request.file_name.as_str();

    if name.trim().is_empty() {
        return Err(PipelineError::InvalidRequest("fileName is required".to_string()));
    }
    if name.len() > MAX_FILE_NAME_BYTES {
        return Err(PipelineError::InvalidRequest(format!(
            "fileName exceeds {} bytes",
            MAX_FILE_NAME_BYTES
        )));
    }
    if name.contains(['/', '\\']) || name.chars().any(char::is_control) || name == "." || name == ".." {
        return Err(PipelineError::InvalidRequest(format!(
            "fileName is not a plain file name: {:?}",
            name
        )));
    }
    if request.file_type.trim().is_empty() {
        return Err(PipelineError::InvalidRequest("fileType is required".to_string()));
    }

    Ok(DocumentFormat::from_file_name(name)?)
}

fn validate_language_code(code: &str) -> PipelineResult<String> {
    let valid = (2..=10).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');

    if valid {
        Ok(code.to_string())
    } else {
        Err(PipelineError::InvalidRequest(format!("invalid languageCode: {:?}", code)))
    }
}
