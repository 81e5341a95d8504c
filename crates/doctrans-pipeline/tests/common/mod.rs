//! Common test utilities for pipeline integration tests
//!
//! In-memory stand-ins for every external collaborator, wired into a real
//! [`PipelineContext`] so handlers run end to end without AWS:
//!
//! - [`MemoryStore`]: file records keyed by id, with a write log
//! - [`FakeObjectStore`]: objects with metadata and deterministic signed URLs
//! - [`FakeEngine`]: prefixes translated text with the target language and
//!   hands out sequential job ids
//! - [`RecordingNotifier`]: keeps every notification it is asked to send
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestPipeline;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let pipeline = TestPipeline::new();
//!     pipeline.objects.insert("uploads", "input/F1/notes.txt", b"Hello".to_vec(), &[]);
//! }
//! ```

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_lambda_events::event::s3::S3Event;
use doctrans_common::{FileRecord, FileStatus};
use doctrans_pipeline::config::PipelineConfig;
use doctrans_pipeline::convert::PdfToDocxConverter;
use doctrans_pipeline::metadata::{single_match, MetadataStore, StatusUpdate, StoreError};
use doctrans_pipeline::notify::{Notification, Notifier};
use doctrans_pipeline::storage::{ObjectStore, PresignedUpload, S3Location, UploadSpec};
use doctrans_pipeline::translate::{TranslationEngine, TranslationJobRequest};
use doctrans_pipeline::PipelineContext;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Bucket receiving uploads in tests.
pub const UPLOAD_BUCKET: &str = "uploads";

/// Bucket receiving translated output in tests.
pub const OUTPUT_BUCKET: &str = "translated";

/// Bucket holding staged job inputs in tests.
pub const STAGING_BUCKET: &str = "staging";

/// Account id carried by job state-change events in tests.
pub const ACCOUNT: &str = "123";

// ============================================================================
// Metadata Store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, FileRecord>>,
    writes: Mutex<Vec<(String, StatusUpdate)>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn insert(&self, record: FileRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.file_id.clone(), record);
    }

    pub fn record(&self, file_id: &str) -> Option<FileRecord> {
        self.records.lock().unwrap().get(file_id).cloned()
    }

    /// Every accepted write, in order.
    pub fn writes(&self) -> Vec<(String, StatusUpdate)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn statuses_written(&self, file_id: &str) -> Vec<FileStatus> {
        self.writes()
            .into_iter()
            .filter(|(id, _)| id == file_id)
            .map(|(_, update)| update.status)
            .collect()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn update_status(&self, file_id: &str, update: StatusUpdate) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write refused".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(file_id.to_string())
            .or_insert_with(|| FileRecord {
                file_id: file_id.to_string(),
                file_name: String::new(),
                language_code: String::new(),
                status: update.status,
                job_id: None,
                updated_at: None,
            });

        record.status = update.status;
        if let Some(job_id) = &update.job_id {
            record.job_id = Some(job_id.clone());
        }
        if let Some(file_name) = &update.file_name {
            record.file_name = file_name.clone();
        }
        if let Some(language_code) = &update.language_code {
            record.language_code = language_code.clone();
        }
        record.updated_at = Some(chrono::Utc::now());

        self.writes
            .lock()
            .unwrap()
            .push((file_id.to_string(), update));
        Ok(())
    }

    async fn find_by_job_id(&self, job_id: &str) -> Result<Option<FileRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }

        let matches = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.job_id.as_deref() == Some(job_id))
            .cloned()
            .collect();
        single_match(job_id, matches)
    }

    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        Ok(self.record(file_id))
    }
}

// ============================================================================
// Object Store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    copies: Mutex<Vec<(S3Location, S3Location)>>,
    signed_gets: Mutex<Vec<(S3Location, Duration)>>,
    signed_puts: Mutex<Vec<(S3Location, UploadSpec, Duration)>>,
    pub fail_presign: AtomicBool,
}

impl FakeObjectStore {
    pub fn insert(&self, bucket: &str, key: &str, data: Vec<u8>, metadata: &[(&str, &str)]) {
        let object = StoredObject {
            data,
            content_type: None,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys currently stored in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn copies(&self) -> Vec<(S3Location, S3Location)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn signed_gets(&self) -> Vec<(S3Location, Duration)> {
        self.signed_gets.lock().unwrap().clone()
    }

    pub fn signed_puts(&self) -> Vec<(S3Location, UploadSpec, Duration)> {
        self.signed_puts.lock().unwrap().clone()
    }

    fn lookup(&self, location: &S3Location) -> Result<StoredObject> {
        self.object(&location.bucket, &location.key)
            .ok_or_else(|| anyhow!("NoSuchKey: {}", location))
    }
}

pub fn signed_url(location: &S3Location, expires_in: Duration) -> String {
    format!(
        "https://{}.s3.test/{}?X-Amz-Expires={}",
        location.bucket,
        location.key,
        expires_in.as_secs()
    )
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get(&self, location: &S3Location) -> Result<Vec<u8>> {
        Ok(self.lookup(location)?.data)
    }

    async fn metadata(&self, location: &S3Location) -> Result<HashMap<String, String>> {
        Ok(self.lookup(location)?.metadata)
    }

    async fn put(
        &self,
        location: &S3Location,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<()> {
        let object = StoredObject {
            data,
            content_type: content_type.map(str::to_string),
            metadata: HashMap::new(),
        };
        self.objects
            .lock()
            .unwrap()
            .insert((location.bucket.clone(), location.key.clone()), object);
        Ok(())
    }

    async fn copy(&self, from: &S3Location, to: &S3Location) -> Result<()> {
        let object = self.lookup(from)?;
        self.objects
            .lock()
            .unwrap()
            .insert((to.bucket.clone(), to.key.clone()), object);
        self.copies.lock().unwrap().push((from.clone(), to.clone()));
        Ok(())
    }

    async fn presigned_get_url(&self, location: &S3Location, expires_in: Duration)
        -> Result<String> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(anyhow!("signing credentials unavailable"));
        }
        self.signed_gets
            .lock()
            .unwrap()
            .push((location.clone(), expires_in));
        Ok(signed_url(location, expires_in))
    }

    async fn presigned_put_url(
        &self,
        location: &S3Location,
        upload: &UploadSpec,
        expires_in: Duration,
    ) -> Result<PresignedUpload> {
        if self.fail_presign.load(Ordering::SeqCst) {
            return Err(anyhow!("signing credentials unavailable"));
        }
        self.signed_puts
            .lock()
            .unwrap()
            .push((location.clone(), upload.clone(), expires_in));

        let mut headers = BTreeMap::from([(
            "Content-Type".to_string(),
            upload.content_type.clone(),
        )]);
        for (name, value) in &upload.metadata {
            headers.insert(format!("x-amz-meta-{}", name), value.clone());
        }

        Ok(PresignedUpload {
            url: signed_url(location, expires_in),
            headers,
        })
    }
}

// ============================================================================
// Translation Engine
// ============================================================================

#[derive(Default)]
pub struct FakeEngine {
    texts: Mutex<Vec<(String, String, String)>>,
    jobs: Mutex<Vec<TranslationJobRequest>>,
    next_job: AtomicUsize,
    pub fail_jobs: AtomicBool,
    pub fail_text: AtomicBool,
}

impl FakeEngine {
    /// `(text, source, target)` of every synchronous request.
    pub fn texts(&self) -> Vec<(String, String, String)> {
        self.texts.lock().unwrap().clone()
    }

    pub fn jobs(&self) -> Vec<TranslationJobRequest> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationEngine for FakeEngine {
    async fn translate_text(&self, text: &str, source: &str, target: &str) -> Result<String> {
        if self.fail_text.load(Ordering::SeqCst) {
            return Err(anyhow!("TooManyRequestsException"));
        }
        self.texts
            .lock()
            .unwrap()
            .push((text.to_string(), source.to_string(), target.to_string()));
        Ok(format!("[{}] {}", target, text))
    }

    async fn start_job(&self, request: &TranslationJobRequest) -> Result<String> {
        if self.fail_jobs.load(Ordering::SeqCst) {
            return Err(anyhow!("AccessDeniedException: role cannot read input"));
        }
        self.jobs.lock().unwrap().push(request.clone());
        let n = self.next_job.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("J{}", n))
    }
}

// ============================================================================
// Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("454 Temporary authentication failure"));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// A [`PipelineContext`] over in-memory collaborators, with handles to each.
pub struct TestPipeline {
    pub ctx: PipelineContext,
    pub store: Arc<MemoryStore>,
    pub objects: Arc<FakeObjectStore>,
    pub engine: Arc<FakeEngine>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let objects = Arc::new(FakeObjectStore::default());
        let engine = Arc::new(FakeEngine::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let ctx = PipelineContext::new(
            config,
            store.clone(),
            objects.clone(),
            engine.clone(),
            notifier.clone(),
            Arc::new(PdfToDocxConverter::new()),
        );

        Self {
            ctx,
            store,
            objects,
            engine,
            notifier,
        }
    }

    /// Store an upload the way a client would after an upload grant.
    pub fn upload(&self, file_id: &str, file_name: &str, data: Vec<u8>, language: &str) -> String {
        let key = format!("input/{}/{}", file_id, file_name);
        self.objects.insert(
            UPLOAD_BUCKET,
            &key,
            data,
            &[("fileid", file_id), ("languagecode", language)],
        );
        key
    }
}

pub fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.buckets.upload = UPLOAD_BUCKET.to_string();
    config.buckets.output = OUTPUT_BUCKET.to_string();
    config.buckets.intermediate = STAGING_BUCKET.to_string();
    config.buckets.upload_prefix = "input".to_string();
    config.buckets.output_prefix = "output".to_string();
    config.buckets.staging_prefix = "input".to_string();
    config.translation.source_language = "en".to_string();
    config.translation.default_target_language = "en".to_string();
    config.mail.recipient = "team@example.com".to_string();
    config.links.download_url_ttl_secs = 3600;
    config.links.upload_url_ttl_secs = 600;
    config
}

pub fn record(file_id: &str, file_name: &str, status: FileStatus, job_id: Option<&str>) -> FileRecord {
    FileRecord {
        file_id: file_id.to_string(),
        file_name: file_name.to_string(),
        language_code: "fr".to_string(),
        status,
        job_id: job_id.map(str::to_string),
        updated_at: None,
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// S3 notification for one created object. `key` is used as delivered, so
/// pass it URL-encoded when it contains spaces or reserved characters.
pub fn s3_event(bucket: &str, key: &str) -> S3Event {
    s3_event_many(&[(bucket, key)])
}

pub fn s3_event_many(objects: &[(&str, &str)]) -> S3Event {
    let records: Vec<serde_json::Value> = objects
        .iter()
        .map(|(bucket, key)| {
            json!({
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-west-1",
                "eventTime": "2024-05-01T12:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": { "principalId": "AWS:EXAMPLE" },
                "requestParameters": { "sourceIPAddress": "127.0.0.1" },
                "responseElements": {},
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "upload",
                    "bucket": {
                        "name": bucket,
                        "ownerIdentity": { "principalId": "EXAMPLE" },
                        "arn": format!("arn:aws:s3:::{}", bucket)
                    },
                    "object": { "key": key, "size": 1024, "eTag": "abc", "sequencer": "0A1B" }
                }
            })
        })
        .collect();

    serde_json::from_value(json!({ "Records": records })).unwrap()
}

/// Job state-change event as delivered by EventBridge.
pub fn job_event(job_id: &str, status: &str) -> serde_json::Value {
    json!({
        "version": "0",
        "id": "6a7e8feb-b491-4cf7-a9f1-bf3703467718",
        "detail-type": "Translate TextTranslationJob State Change",
        "source": "aws.translate",
        "account": ACCOUNT,
        "time": "2024-05-01T12:30:00Z",
        "region": "us-west-1",
        "resources": [],
        "detail": { "jobId": job_id, "jobStatus": status }
    })
}

/// Minimal PDF with one page per entry; an empty entry gives a page with no
/// text.
pub fn sample_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", text)
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// `word/document.xml` of a DOCX package.
pub fn docx_document_xml(bytes: &[u8]) -> String {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}
