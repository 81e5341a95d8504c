//! Translation engine access
//!
//! [`TranslationEngine`] is the raw engine API. [`JobSubmitter`] sits on top
//! of it and owns the request conventions: content type by format, fixed
//! source language, job naming, idempotency token, and chunking for the
//! synchronous path.

use anyhow::Result;
use async_trait::async_trait;
use doctrans_common::DocumentFormat;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::TranslationConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::S3Location;

pub mod aws;

pub use aws::AwsTranslationEngine;

/// Largest text, in UTF-8 bytes, sent in one synchronous request.
pub const MAX_TEXT_BYTES: usize = 10_000;

/// Prefix of every asynchronous job name.
pub const JOB_NAME_PREFIX: &str = "doctrans";

/// Parameters of one asynchronous batch job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJobRequest {
    pub job_name: String,
    pub client_token: String,
    /// `s3://` prefix holding the staged input
    pub input_uri: String,
    /// `s3://` prefix the engine writes results under
    pub output_uri: String,
    pub data_access_role_arn: String,
    pub source_language: String,
    pub target_language: String,
    pub content_type: String,
}

/// Translation engine operations
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Translate a short text synchronously.
    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Start an asynchronous batch job and return the engine's job id.
    async fn start_job(&self, request: &TranslationJobRequest) -> Result<String>;
}

/// Builds and submits translation requests
#[derive(Clone)]
pub struct JobSubmitter {
    engine: Arc<dyn TranslationEngine>,
    config: TranslationConfig,
}

impl JobSubmitter {
    pub fn new(engine: Arc<dyn TranslationEngine>, config: TranslationConfig) -> Self {
        Self { engine, config }
    }

    /// Request for translating the documents staged under `input`.
    ///
    /// `format` is the format after adaptation, so a converted PDF is
    /// submitted as a Word document.
    pub fn job_request(
        &self,
        staging_id: &str,
        input: &S3Location,
        output: &S3Location,
        target_language: &str,
        format: DocumentFormat,
    ) -> TranslationJobRequest {
        TranslationJobRequest {
            job_name: job_name(staging_id),
            client_token: client_token(staging_id),
            input_uri: input.uri(),
            output_uri: output.uri(),
            data_access_role_arn: self.config.data_access_role_arn.clone(),
            source_language: self.config.source_language.clone(),
            target_language: target_language.to_string(),
            content_type: format.translation_content_type().to_string(),
        }
    }

    /// Submit an asynchronous job, returning its id.
    #[instrument(skip(self, input, output), fields(input = %input, output = %output))]
    pub async fn submit(
        &self,
        staging_id: &str,
        input: &S3Location,
        output: &S3Location,
        target_language: &str,
        format: DocumentFormat,
    ) -> PipelineResult<String> {
        let request = self.job_request(staging_id, input, output, target_language, format);

        let job_id = self
            .engine
            .start_job(&request)
            .await
            .map_err(|e| PipelineError::SubmissionFailure(format!("{:#}", e)))?;

        if job_id.trim().is_empty() {
            return Err(PipelineError::SubmissionFailure(
                "engine returned an empty job id".to_string(),
            ));
        }

        info!(job_id = %job_id, job_name = %request.job_name, "Translation job submitted");

        Ok(job_id)
    }

    /// Translate `text` synchronously, chunk by chunk.
    ///
    /// Chunks end on line boundaries; line terminators are kept out of the
    /// request and re-attached so the output has the input's line layout.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub async fn translate_text(&self, text: &str, target_language: &str) -> PipelineResult<String> {
        let chunks = chunk_text(text, MAX_TEXT_BYTES);
        debug!(chunks = chunks.len(), "Translating text");

        let mut translated = String::with_capacity(text.len());
        for chunk in chunks {
            let body = chunk.trim_end_matches(['\r', '\n']);
            let terminator = &chunk[body.len()..];

            if !body.trim().is_empty() {
                let output = self
                    .engine
                    .translate_text(body, &self.config.source_language, target_language)
                    .await
                    .map_err(|e| PipelineError::TranslationFailure(format!("{:#}", e)))?;
                translated.push_str(&output);
            } else {
                translated.push_str(body);
            }
            translated.push_str(terminator);
        }

        Ok(translated)
    }
}

/// Job name for a staging id.
pub fn job_name(staging_id: &str) -> String {
    format!("{}-{}", JOB_NAME_PREFIX, staging_id)
}

/// Idempotency token for a staging id.
///
/// The engine accepts `[a-zA-Z0-9-]{1,64}`; anything else is dropped.
pub fn client_token(staging_id: &str) -> String {
    let token: String = staging_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(64)
        .collect();

    if token.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        token
    }
}

/// Split `text` into contiguous slices of at most `max_bytes` bytes.
///
/// Slices break after a `\n` whenever possible. A single line longer than
/// `max_bytes` is cut on char boundaries. Concatenating the slices gives
/// back `text`.
pub fn chunk_text(text: &str, max_bytes: usize) -> Vec<&str> {
    // A cut must always make progress past one UTF-8 scalar.
    let max_bytes = max_bytes.max(4);

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for line in text.split_inclusive('\n') {
        let line_end = end + line.len();

        if line_end - start > max_bytes && end > start {
            chunks.push(&text[start..end]);
            start = end;
        }

        while line_end - start > max_bytes {
            let mut cut = start + max_bytes;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            chunks.push(&text[start..cut]);
            start = cut;
        }

        end = line_end;
    }

    if end > start {
        chunks.push(&text[start..end]);
    }

    chunks
}
