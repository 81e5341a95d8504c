//! DynamoDB-backed metadata store
//!
//! Table layout: partition key `fileId` (S); global secondary index
//! (default `JobIdIndex`) with partition key `jobId` (S).

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::DisplayErrorContext, types::AttributeValue, Client};
use chrono::{DateTime, SecondsFormat, Utc};
use doctrans_common::{FileRecord, FileStatus};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

use super::{single_match, MetadataStore, StatusUpdate, StoreError};
use crate::config::MetadataConfig;

pub const ATTR_FILE_ID: &str = "fileId";
pub const ATTR_FILE_NAME: &str = "fileName";
pub const ATTR_LANGUAGE_CODE: &str = "languageCode";
pub const ATTR_STATUS: &str = "status";
pub const ATTR_JOB_ID: &str = "jobId";
pub const ATTR_UPDATED_AT: &str = "updatedAt";

type Item = HashMap<String, AttributeValue>;

/// `UpdateItem` parameters derived from a [`StatusUpdate`]
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl UpdatePlan {
    /// Translate a partial update into a `SET` expression.
    ///
    /// Only the fields present in `update` appear in the expression, in a
    /// fixed order so identical updates produce identical requests.
    pub fn from_update(update: &StatusUpdate, updated_at: DateTime<Utc>) -> Self {
        let mut assignments = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::new();

        let mut set = |attr: &str, value: String| {
            assignments.push(format!("#{attr} = :{attr}"));
            names.insert(format!("#{attr}"), attr.to_string());
            values.insert(format!(":{attr}"), AttributeValue::S(value));
        };

        set(ATTR_STATUS, update.status.as_str().to_string());
        set(
            ATTR_UPDATED_AT,
            updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        if let Some(job_id) = &update.job_id {
            set(ATTR_JOB_ID, job_id.clone());
        }
        if let Some(file_name) = &update.file_name {
            set(ATTR_FILE_NAME, file_name.clone());
        }
        if let Some(language_code) = &update.language_code {
            set(ATTR_LANGUAGE_CODE, language_code.clone());
        }

        Self {
            expression: format!("SET {}", assignments.join(", ")),
            names,
            values,
        }
    }
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::as_str)
}

fn required_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str, StoreError> {
    string_attr(item, name)
        .ok_or_else(|| StoreError::Malformed(format!("missing string attribute '{}'", name)))
}

/// Decode a table item into a [`FileRecord`].
pub fn record_from_item(item: &Item) -> Result<FileRecord, StoreError> {
    let file_id = required_attr(item, ATTR_FILE_ID)?;
    let status: FileStatus = required_attr(item, ATTR_STATUS)?
        .parse()
        .map_err(|e| StoreError::Malformed(format!("record {}: {}", file_id, e)))?;

    Ok(FileRecord {
        file_id: file_id.to_string(),
        file_name: required_attr(item, ATTR_FILE_NAME)?.to_string(),
        language_code: required_attr(item, ATTR_LANGUAGE_CODE)?.to_string(),
        status,
        job_id: string_attr(item, ATTR_JOB_ID).map(str::to_string),
        updated_at: string_attr(item, ATTR_UPDATED_AT)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc)),
    })
}

fn unavailable<E>(operation: &str, err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Unavailable(format!("{} failed: {}", operation, DisplayErrorContext(err)))
}

/// [`MetadataStore`] over a DynamoDB table
#[derive(Clone)]
pub struct DynamoMetadataStore {
    client: Client,
    table_name: String,
    job_id_index: String,
}

impl DynamoMetadataStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, config: &MetadataConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            table = %config.table_name,
            index = %config.job_id_index,
            "Metadata store client initialized"
        );

        Self::from_client(
            Client::from_conf(builder.build()),
            config.table_name.clone(),
            config.job_id_index.clone(),
        )
    }

    pub fn from_client(client: Client, table_name: String, job_id_index: String) -> Self {
        Self {
            client,
            table_name,
            job_id_index,
        }
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    #[instrument(skip(self, update), fields(status = %update.status))]
    async fn update_status(&self, file_id: &str, update: StatusUpdate) -> Result<(), StoreError> {
        let plan = UpdatePlan::from_update(&update, Utc::now());

        debug!(expression = %plan.expression, "Updating file record");

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key(ATTR_FILE_ID, AttributeValue::S(file_id.to_string()))
            .update_expression(plan.expression)
            .set_expression_attribute_names(Some(plan.names))
            .set_expression_attribute_values(Some(plan.values))
            .send()
            .await
            .map_err(|e| unavailable("UpdateItem", e))?;

        info!(
            job_id = ?update.job_id,
            "Updated status for file {} to '{}'",
            file_id,
            update.status
        );

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<FileRecord>, StoreError> {
        // Two is enough to tell "one" from "more than one".
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.job_id_index)
            .key_condition_expression("#jobId = :jobId")
            .expression_attribute_names("#jobId", ATTR_JOB_ID)
            .expression_attribute_values(":jobId", AttributeValue::S(job_id.to_string()))
            .limit(2)
            .send()
            .await
            .map_err(|e| unavailable("Query", e))?;

        let records = output
            .items()
            .iter()
            .map(record_from_item)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(matches = records.len(), "Job id lookup finished");

        single_match(job_id, records)
    }

    #[instrument(skip(self))]
    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_FILE_ID, AttributeValue::S(file_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| unavailable("GetItem", e))?;

        output.item().map(record_from_item).transpose()
    }
}
