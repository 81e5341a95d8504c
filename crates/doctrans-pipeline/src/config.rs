//! Configuration management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::storage::{config::StorageConfig, S3Location};

// ============================================================================
// Configuration Defaults
// ============================================================================

/// Default DynamoDB table holding file records.
pub const DEFAULT_TABLE_NAME: &str = "FileMetadata";

/// Default global secondary index keyed by `jobId`.
pub const DEFAULT_JOB_ID_INDEX: &str = "JobIdIndex";

/// Default bucket receiving user uploads.
pub const DEFAULT_UPLOAD_BUCKET: &str = "input-bucketbd99d-dev";

/// Default bucket receiving translated documents.
pub const DEFAULT_OUTPUT_BUCKET: &str = "outputbucket-dev";

/// Default bucket holding staged job inputs (converted PDFs, copied DOCX).
pub const DEFAULT_INTERMEDIATE_BUCKET: &str = "outputbucket-dev";

/// Default key prefix for uploads issued by the upload-URL handler.
pub const DEFAULT_UPLOAD_PREFIX: &str = "input";

/// Default key prefix for translation output.
pub const DEFAULT_OUTPUT_PREFIX: &str = "output";

/// Default key prefix for staged job inputs.
pub const DEFAULT_STAGING_PREFIX: &str = "input";

/// Default role the translation engine assumes to access the buckets.
pub const DEFAULT_DATA_ACCESS_ROLE_ARN: &str =
    "arn:aws:iam::000000000000:role/TranslateDataAccessRole";

/// Default source language of uploaded documents.
pub const DEFAULT_SOURCE_LANGUAGE: &str = "en";

/// Target language used when an upload carries no `languagecode` metadata.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

/// Default lifetime of download links sent by email (1 hour).
pub const DEFAULT_DOWNLOAD_URL_TTL_SECS: u64 = 3600;

/// Default lifetime of upload links handed to clients (10 minutes).
pub const DEFAULT_UPLOAD_URL_TTL_SECS: u64 = 600;

/// Longest lifetime S3 accepts for a presigned URL (7 days).
pub const MAX_PRESIGNED_URL_TTL_SECS: u64 = 7 * 24 * 3600;

/// Default SMTP relay host.
pub const DEFAULT_SMTP_SERVER: &str = "email-smtp.us-west-1.amazonaws.com";

/// Default SMTP relay port (STARTTLS submission).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address.
pub const DEFAULT_FROM_EMAIL: &str = "translations@example.com";

/// Default notification recipient.
pub const DEFAULT_RECIPIENT_EMAIL: &str = "translations@example.com";

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub metadata: MetadataConfig,
    pub buckets: BucketConfig,
    pub translation: TranslationConfig,
    pub mail: MailConfig,
    pub links: LinkConfig,
    pub storage: StorageConfig,
}

/// Metadata table configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub table_name: String,
    pub job_id_index: String,
    /// Endpoint override, e.g. DynamoDB Local
    pub endpoint: Option<String>,
}

/// Bucket layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub upload: String,
    pub output: String,
    pub intermediate: String,
    pub upload_prefix: String,
    pub output_prefix: String,
    pub staging_prefix: String,
}

impl BucketConfig {
    /// Where a client uploads `file_name` for `file_id`.
    pub fn upload_location(&self, file_id: &str, file_name: &str) -> S3Location {
        S3Location::new(
            &self.upload,
            join_key(&self.upload_prefix, &format!("{}/{}", file_id, file_name)),
        )
    }

    /// Staging directory handed to the translation engine as job input.
    pub fn staging_dir(&self, staging_id: &str) -> S3Location {
        S3Location::new(
            &self.intermediate,
            join_key(&self.staging_prefix, &format!("{}/", staging_id)),
        )
    }

    /// Staged copy of `file_name`.
    pub fn staging_location(&self, staging_id: &str, file_name: &str) -> S3Location {
        let dir = self.staging_dir(staging_id);
        S3Location::new(dir.bucket, format!("{}{}", dir.key, file_name))
    }

    /// Directory the translation engine writes job results under.
    pub fn output_dir(&self) -> S3Location {
        S3Location::new(&self.output, join_key(&self.output_prefix, ""))
    }

    /// Result of a synchronous text translation.
    pub fn text_output_location(&self, file_name: &str) -> S3Location {
        S3Location::new(
            &self.output,
            join_key(&self.output_prefix, &format!("Translated-{}", file_name)),
        )
    }

    /// Result of an asynchronous job.
    ///
    /// The engine writes `<account>-TranslateText-<jobId>/<lang>.<name>`
    /// under the output directory, where `<name>` is the submitted file name.
    pub fn job_output_location(
        &self,
        account: &str,
        job_id: &str,
        language_code: &str,
        translated_file_name: &str,
    ) -> S3Location {
        S3Location::new(
            &self.output,
            join_key(
                &self.output_prefix,
                &format!(
                    "{}-TranslateText-{}/{}.{}",
                    account, job_id, language_code, translated_file_name
                ),
            ),
        )
    }
}

/// `prefix/rest`, tolerating an empty prefix or a trailing slash.
fn join_key(prefix: &str, rest: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}/{}", prefix, rest)
    }
}

/// Translation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    pub source_language: String,
    pub default_target_language: String,
    pub data_access_role_arn: String,
}

/// SMTP relay configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub from: String,
    pub recipient: String,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Presigned link lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub download_url_ttl_secs: u64,
    pub upload_url_ttl_secs: u64,
}

impl LinkConfig {
    pub fn download_ttl(&self) -> Duration {
        Duration::from_secs(self.download_url_ttl_secs)
    }

    pub fn upload_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_url_ttl_secs)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl PipelineConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = PipelineConfig {
            metadata: MetadataConfig {
                table_name: env_or("DYNAMODB_TABLE", DEFAULT_TABLE_NAME),
                job_id_index: env_or("JOB_ID_INDEX", DEFAULT_JOB_ID_INDEX),
                endpoint: env_opt("DYNAMODB_ENDPOINT"),
            },
            buckets: BucketConfig {
                upload: env_or("UPLOAD_BUCKET", DEFAULT_UPLOAD_BUCKET),
                output: env_or("OUTPUT_BUCKET", DEFAULT_OUTPUT_BUCKET),
                intermediate: env_or("INTERMEDIATE_BUCKET", DEFAULT_INTERMEDIATE_BUCKET),
                upload_prefix: env_or("UPLOAD_PREFIX", DEFAULT_UPLOAD_PREFIX),
                output_prefix: env_or("OUTPUT_PREFIX", DEFAULT_OUTPUT_PREFIX),
                staging_prefix: env_or("STAGING_PREFIX", DEFAULT_STAGING_PREFIX),
            },
            translation: TranslationConfig {
                source_language: env_or("SOURCE_LANGUAGE", DEFAULT_SOURCE_LANGUAGE),
                default_target_language: env_or(
                    "DEFAULT_TARGET_LANGUAGE",
                    DEFAULT_TARGET_LANGUAGE,
                ),
                data_access_role_arn: env_or(
                    "DATA_ACCESS_ROLE_ARN",
                    DEFAULT_DATA_ACCESS_ROLE_ARN,
                ),
            },
            mail: MailConfig {
                smtp_server: env_or("SES_SMTP_SERVER", DEFAULT_SMTP_SERVER),
                smtp_port: env_parse("SES_SMTP_PORT", DEFAULT_SMTP_PORT),
                smtp_user: env_opt("SES_SMTP_USER"),
                smtp_password: env_opt("SES_SMTP_PASSWORD"),
                from: env_or("SES_FROM_EMAIL", DEFAULT_FROM_EMAIL),
                recipient: env_or("SES_RECIPIENT_EMAIL", DEFAULT_RECIPIENT_EMAIL),
            },
            links: LinkConfig {
                download_url_ttl_secs: env_parse(
                    "DOWNLOAD_URL_TTL_SECS",
                    DEFAULT_DOWNLOAD_URL_TTL_SECS,
                ),
                upload_url_ttl_secs: env_parse("UPLOAD_URL_TTL_SECS", DEFAULT_UPLOAD_URL_TTL_SECS),
            },
            storage: StorageConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("DYNAMODB_TABLE", &self.metadata.table_name),
            ("JOB_ID_INDEX", &self.metadata.job_id_index),
            ("UPLOAD_BUCKET", &self.buckets.upload),
            ("OUTPUT_BUCKET", &self.buckets.output),
            ("INTERMEDIATE_BUCKET", &self.buckets.intermediate),
            ("SOURCE_LANGUAGE", &self.translation.source_language),
            ("DEFAULT_TARGET_LANGUAGE", &self.translation.default_target_language),
            ("DATA_ACCESS_ROLE_ARN", &self.translation.data_access_role_arn),
            ("SES_SMTP_SERVER", &self.mail.smtp_server),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
        }

        for prefix in [
            &self.buckets.upload_prefix,
            &self.buckets.output_prefix,
            &self.buckets.staging_prefix,
        ] {
            if prefix.contains("//") {
                anyhow::bail!("Key prefix '{}' contains an empty path segment", prefix);
            }
        }

        for (name, ttl) in [
            ("DOWNLOAD_URL_TTL_SECS", self.links.download_url_ttl_secs),
            ("UPLOAD_URL_TTL_SECS", self.links.upload_url_ttl_secs),
        ] {
            if ttl == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
            if ttl > MAX_PRESIGNED_URL_TTL_SECS {
                anyhow::bail!(
                    "{} ({}) exceeds the presigned URL maximum of {} seconds",
                    name,
                    ttl,
                    MAX_PRESIGNED_URL_TTL_SECS
                );
            }
        }

        if self.mail.smtp_port == 0 {
            anyhow::bail!("SES_SMTP_PORT must be greater than 0");
        }

        for (name, address) in [
            ("SES_FROM_EMAIL", &self.mail.from),
            ("SES_RECIPIENT_EMAIL", &self.mail.recipient),
        ] {
            if !address.contains('@') {
                anyhow::bail!("{} is not an email address: {}", name, address);
            }
        }

        if self.mail.smtp_user.is_none() || self.mail.smtp_password.is_none() {
            tracing::warn!("SMTP credentials not configured - notifications will be sent unauthenticated");
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metadata: MetadataConfig {
                table_name: DEFAULT_TABLE_NAME.to_string(),
                job_id_index: DEFAULT_JOB_ID_INDEX.to_string(),
                endpoint: None,
            },
            buckets: BucketConfig {
                upload: DEFAULT_UPLOAD_BUCKET.to_string(),
                output: DEFAULT_OUTPUT_BUCKET.to_string(),
                intermediate: DEFAULT_INTERMEDIATE_BUCKET.to_string(),
                upload_prefix: DEFAULT_UPLOAD_PREFIX.to_string(),
                output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
                staging_prefix: DEFAULT_STAGING_PREFIX.to_string(),
            },
            translation: TranslationConfig {
                source_language: DEFAULT_SOURCE_LANGUAGE.to_string(),
                default_target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
                data_access_role_arn: DEFAULT_DATA_ACCESS_ROLE_ARN.to_string(),
            },
            mail: MailConfig {
                smtp_server: DEFAULT_SMTP_SERVER.to_string(),
                smtp_port: DEFAULT_SMTP_PORT,
                smtp_user: None,
                smtp_password: None,
                from: DEFAULT_FROM_EMAIL.to_string(),
                recipient: DEFAULT_RECIPIENT_EMAIL.to_string(),
            },
            links: LinkConfig {
                download_url_ttl_secs: DEFAULT_DOWNLOAD_URL_TTL_SECS,
                upload_url_ttl_secs: DEFAULT_UPLOAD_URL_TTL_SECS,
            },
            storage: StorageConfig::default(),
        }
    }
}
