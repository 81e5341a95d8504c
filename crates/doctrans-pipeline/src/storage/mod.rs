//! Object storage
//!
//! [`ObjectStore`] is the seam the handlers talk to; [`S3ObjectStore`] is the
//! production implementation. Every call names its bucket explicitly since
//! the pipeline reads from the upload bucket, stages into the intermediate
//! bucket and writes into the output bucket.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{config::Region, presigning::PresigningConfig, primitives::ByteStream, Client};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, instrument};

pub mod config;

/// Bucket and key of one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `s3://bucket/key` form used by the translation engine.
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Last path segment of the key.
    pub fn file_name(&self) -> &str {
        doctrans_common::types::base_name(&self.key)
    }
}

impl std::fmt::Display for S3Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Headers a presigned PUT was signed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSpec {
    pub content_type: String,
    /// User metadata, sent as `x-amz-meta-<name>`
    pub metadata: BTreeMap<String, String>,
}

/// A presigned PUT request.
///
/// The client must send every header in `headers` verbatim or the signature
/// will not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUpload {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

/// Object store operations used by the pipeline
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object.
    async fn get(&self, location: &S3Location) -> Result<Vec<u8>>;

    /// User metadata of an object, with lower-cased names.
    async fn metadata(&self, location: &S3Location) -> Result<HashMap<String, String>>;

    /// Write a whole object, replacing any existing one.
    async fn put(&self, location: &S3Location, data: Vec<u8>, content_type: Option<&str>)
        -> Result<()>;

    /// Server-side copy.
    async fn copy(&self, from: &S3Location, to: &S3Location) -> Result<()>;

    /// Credential-free download link valid for `expires_in`.
    async fn presigned_get_url(&self, location: &S3Location, expires_in: Duration)
        -> Result<String>;

    /// Credential-free upload link valid for `expires_in`.
    async fn presigned_put_url(
        &self,
        location: &S3Location,
        upload: &UploadSpec,
        expires_in: Duration,
    ) -> Result<PresignedUpload>;
}

/// S3-backed [`ObjectStore`]
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, config: &config::StorageConfig) -> Self {
        debug!(
            endpoint = ?config.endpoint,
            region = ?config.region,
            path_style = config.path_style,
            "Initializing storage client"
        );

        let mut builder =
            aws_sdk_s3::config::Builder::from(sdk_config).force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }

        if let Some((access_key, secret_key)) = config.static_credentials() {
            builder = builder.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "doctrans-storage",
            ));
        }

        info!("Storage client initialized");

        Self::from_client(Client::from_conf(builder.build()))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip_all, fields(location = %location))]
    async fn get(&self, location: &S3Location) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .context(format!("Failed to download from S3: {}", location))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from {}", data.len(), location);

        Ok(data)
    }

    #[instrument(skip_all, fields(location = %location))]
    async fn metadata(&self, location: &S3Location) -> Result<HashMap<String, String>> {
        let response = self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .context(format!("Failed to get metadata from S3: {}", location))?;

        Ok(response
            .metadata()
            .map(|metadata| {
                metadata
                    .iter()
                    .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip_all, fields(location = %location, size = data.len()))]
    async fn put(
        &self,
        location: &S3Location,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .context(format!("Failed to upload to S3: {}", location))?;

        info!("Successfully uploaded to {}", location);

        Ok(())
    }

    #[instrument(skip_all, fields(from = %from, to = %to))]
    async fn copy(&self, from: &S3Location, to: &S3Location) -> Result<()> {
        self.client
            .copy_object()
            .bucket(&to.bucket)
            .key(&to.key)
            .copy_source(copy_source(from))
            .send()
            .await
            .context(format!("Failed to copy {} to {}", from, to))?;

        info!("Successfully copied {} to {}", from, to);

        Ok(())
    }

    #[instrument(skip_all, fields(location = %location))]
    async fn presigned_get_url(
        &self,
        location: &S3Location,
        expires_in: Duration,
    ) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .context("Failed to create presigning config")?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned URL")?;

        debug!("Generated presigned GET URL for {} ({:?})", location, expires_in);

        Ok(presigned_request.uri().to_string())
    }

    #[instrument(skip_all, fields(location = %location))]
    async fn presigned_put_url(
        &self,
        location: &S3Location,
        upload: &UploadSpec,
        expires_in: Duration,
    ) -> Result<PresignedUpload> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .context("Failed to create presigning config")?;

        let mut request = self
            .client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .content_type(&upload.content_type);

        for (name, value) in &upload.metadata {
            request = request.metadata(name, value);
        }

        let presigned_request = request
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned upload URL")?;

        let headers = presigned_request
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        debug!("Generated presigned PUT URL for {} ({:?})", location, expires_in);

        Ok(PresignedUpload {
            url: presigned_request.uri().to_string(),
            headers,
        })
    }
}

/// `CopySource` value: bucket and URL-encoded key, path separators kept.
fn copy_source(location: &S3Location) -> String {
    let key = location
        .key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", location.bucket, key)
}
