//! Service handles shared by the handlers
//!
//! Built once per Lambda execution environment and passed by reference to
//! every invocation.

use anyhow::Result;
use aws_config::BehaviorVersion;
use std::sync::Arc;
use tracing::info;

use crate::config::PipelineConfig;
use crate::convert::{DocumentConverter, PdfToDocxConverter};
use crate::metadata::{DynamoMetadataStore, MetadataStore};
use crate::notify::{Notifier, SmtpNotifier};
use crate::storage::{ObjectStore, S3ObjectStore};
use crate::translate::{AwsTranslationEngine, JobSubmitter, TranslationEngine};

/// Configuration plus one handle per external collaborator
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<PipelineConfig>,
    pub store: Arc<dyn MetadataStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub submitter: JobSubmitter,
    pub notifier: Arc<dyn Notifier>,
    pub converter: Arc<dyn DocumentConverter>,
}

impl PipelineContext {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn MetadataStore>,
        objects: Arc<dyn ObjectStore>,
        engine: Arc<dyn TranslationEngine>,
        notifier: Arc<dyn Notifier>,
        converter: Arc<dyn DocumentConverter>,
    ) -> Self {
        let submitter = JobSubmitter::new(engine, config.translation.clone());
        Self {
            config: Arc::new(config),
            store,
            objects,
            submitter,
            notifier,
            converter,
        }
    }

    /// Load configuration and build the AWS-backed collaborators.
    pub async fn from_env() -> Result<Self> {
        let config = PipelineConfig::load()?;
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let store = DynamoMetadataStore::new(&sdk_config, &config.metadata);
        let objects = S3ObjectStore::new(&sdk_config, &config.storage);
        let engine = AwsTranslationEngine::new(&sdk_config);
        let notifier = SmtpNotifier::new(&config.mail)?;

        info!(
            region = ?sdk_config.region(),
            output_bucket = %config.buckets.output,
            "Pipeline context initialized"
        );

        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(objects),
            Arc::new(engine),
            Arc::new(notifier),
            Arc::new(PdfToDocxConverter::new()),
        ))
    }

    /// Recipient of every notification.
    pub fn recipient(&self) -> &str {
        &self.config.mail.recipient
    }
}
