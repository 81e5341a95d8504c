//! Amazon Translate engine

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_translate::{
    error::DisplayErrorContext,
    types::{InputDataConfig, OutputDataConfig},
    Client,
};
use tracing::{debug, instrument};

use super::{TranslationEngine, TranslationJobRequest};

/// [`TranslationEngine`] backed by Amazon Translate
#[derive(Clone)]
pub struct AwsTranslationEngine {
    client: Client,
}

impl AwsTranslationEngine {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TranslationEngine for AwsTranslationEngine {
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let output = self
            .client
            .translate_text()
            .text(text)
            .source_language_code(source)
            .target_language_code(target)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))
            .context("TranslateText request failed")?;

        Ok(output.translated_text().to_string())
    }

    #[instrument(skip_all, fields(job_name = %request.job_name))]
    async fn start_job(&self, request: &TranslationJobRequest) -> Result<String> {
        let input = InputDataConfig::builder()
            .s3_uri(&request.input_uri)
            .content_type(&request.content_type)
            .build()
            .context("Invalid job input configuration")?;

        let output = OutputDataConfig::builder()
            .s3_uri(&request.output_uri)
            .build()
            .context("Invalid job output configuration")?;

        debug!(
            input = %request.input_uri,
            output = %request.output_uri,
            content_type = %request.content_type,
            target = %request.target_language,
            "Starting text translation job"
        );

        let response = self
            .client
            .start_text_translation_job()
            .job_name(&request.job_name)
            .client_token(&request.client_token)
            .input_data_config(input)
            .output_data_config(output)
            .data_access_role_arn(&request.data_access_role_arn)
            .source_language_code(&request.source_language)
            .target_language_codes(&request.target_language)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(e)))
            .context("StartTextTranslationJob request failed")?;

        response
            .job_id()
            .map(str::to_string)
            .context("StartTextTranslationJob returned no job id")
    }
}
